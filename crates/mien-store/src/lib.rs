//! mien-store — Face record persistence and the known-face cache.
//!
//! The document store keeps one record per registered name. Records are
//! heterogeneous for historical reasons: the native client wrote raw image
//! bytes, the web client wrote base64 image strings, and current code writes
//! canonical binary embeddings. The cache refresh cycle normalizes whatever
//! it finds and opportunistically rewrites legacy records in canonical form.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod record;
pub mod sqlite;
pub mod store;

pub use adapter::EmbeddingStore;
pub use cache::{spawn_refresh_loop, FaceCache, DEFAULT_REFRESH_PERIOD};
pub use config::Config;
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, RawDocument, RawStoredValue, StoreError};
