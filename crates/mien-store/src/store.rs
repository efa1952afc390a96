//! Document-store boundary: one record per registered name.

use async_trait::async_trait;
use thiserror::Error;

/// A record payload as persisted, before normalization.
///
/// The store's value column is dynamically typed because two producers
/// disagreed on format: the web client wrote TEXT (base64 images), the
/// native client and current code write BLOBs (raw images then, canonical
/// embeddings now).
#[derive(Debug, Clone, PartialEq)]
pub enum RawStoredValue {
    /// BLOB payload: a canonical embedding or a legacy raw encoded image.
    Binary(Vec<u8>),
    /// TEXT payload: a legacy base64 image, data-URI prefix optional.
    Text(String),
}

/// One stored record, as fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub name: String,
    pub value: RawStoredValue,
    /// RFC 3339 registration time; absent on records from the legacy clients.
    pub registered_at: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or the query failed outright.
    /// Fatal to the current refresh cycle only; the prior snapshot stands.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("a record named {0:?} already exists")]
    DuplicateName(String),
    #[error("no record named {0:?}")]
    NotFound(String),
    #[error("canonical encode failed: {0}")]
    Encode(#[from] postcard::Error),
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Keyed record access with a uniqueness constraint on `name`.
///
/// Write atomicity is per-document; no cross-record transactions are
/// assumed. Concurrent registration of one name fails fast on the
/// constraint rather than double-writing (a cross-process race may still
/// see both inserts attempted; the store resolves it, the loser errors).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All records in insertion order. Ordering is load-bearing: the
    /// matcher's first-match tie-break follows it.
    async fn fetch_all(&self) -> Result<Vec<RawDocument>, StoreError>;

    async fn fetch_one(&self, name: &str) -> Result<Option<RawStoredValue>, StoreError>;

    /// Insert a new record; [`StoreError::DuplicateName`] if the name exists.
    async fn insert(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError>;

    /// Replace an existing record's payload; [`StoreError::NotFound`] if absent.
    async fn update(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError>;

    /// Delete a record; returns whether it existed.
    async fn remove(&self, name: &str) -> Result<bool, StoreError>;
}
