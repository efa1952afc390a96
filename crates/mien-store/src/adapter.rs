//! Embedding store adapter: canonical reads/writes over the document store.

use mien_core::types::Embedding;

use crate::record;
use crate::store::{DocumentStore, RawDocument, RawStoredValue, StoreError};

/// Store access in embedding terms.
///
/// Wraps a [`DocumentStore`] with the canonical encoding, the opportunistic
/// migration write, and the registration insert.
pub struct EmbeddingStore<S> {
    store: S,
}

impl<S: DocumentStore> EmbeddingStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// All raw records, insertion order. Errors here are fatal to the
    /// calling refresh cycle only.
    pub async fn fetch_all(&self) -> Result<Vec<RawDocument>, StoreError> {
        self.store.fetch_all().await
    }

    /// Rewrite a record in canonical form after a successful fallback
    /// decode. Failures are logged and swallowed: the in-memory cache
    /// already has the fresh embedding, and the record will be retried on
    /// a later cycle.
    pub async fn persist_canonical(&self, name: &str, embedding: &Embedding) {
        let payload = match record::encode_canonical(embedding) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(name = %name, error = %err, "canonical encode failed; record left as-is");
                return;
            }
        };
        match self.store.update(name, RawStoredValue::Binary(payload)).await {
            Ok(()) => {
                tracing::info!(name = %name, "legacy record rewritten in canonical form");
            }
            Err(err) => {
                tracing::warn!(name = %name, error = %err, "canonical rewrite failed; record left as-is");
            }
        }
    }

    /// Register a new face under a unique name.
    ///
    /// Fails fast with [`StoreError::DuplicateName`] if the name is taken.
    pub async fn register(&self, name: &str, embedding: &Embedding) -> Result<(), StoreError> {
        let payload = record::encode_canonical(embedding)?;
        self.store.insert(name, RawStoredValue::Binary(payload)).await?;
        tracing::info!(name = %name, dim = embedding.dim(), "face registered");
        Ok(())
    }

    /// Delete a registered face; returns whether it existed.
    pub async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        self.store.remove(name).await
    }
}
