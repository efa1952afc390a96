//! Known-face cache: the in-memory snapshot every match reads.
//!
//! A single background task refreshes the snapshot from the store on a
//! fixed period; readers clone an `Arc` and iterate without touching any
//! lock the writer holds. The snapshot is replaced wholesale, so a reader
//! can never observe a half-built list, and a store outage leaves the
//! previous snapshot standing rather than emptying the known-face set.

use std::sync::Arc;
use std::time::Duration;

use mien_core::engine::FaceEmbedder;
use mien_core::matcher::{FirstMatchMatcher, Matcher};
use mien_core::types::{Embedding, FaceRecord, MatchOutcome, Snapshot};
use parking_lot::RwLock;

use crate::adapter::EmbeddingStore;
use crate::record::{self, Normalized};
use crate::store::DocumentStore;

/// Default period between refresh cycles.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(10);

/// In-memory cache of all registered faces.
pub struct FaceCache<S, E> {
    adapter: EmbeddingStore<S>,
    embedder: E,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl<S, E> FaceCache<S, E>
where
    S: DocumentStore,
    E: FaceEmbedder,
{
    /// Create an empty cache; call [`refresh`](Self::refresh) (or spawn the
    /// refresh loop) to populate it.
    pub fn new(adapter: EmbeddingStore<S>, embedder: E) -> Self {
        Self {
            adapter,
            embedder,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    pub fn adapter(&self) -> &EmbeddingStore<S> {
        &self.adapter
    }

    /// Current published snapshot. Non-blocking; the returned `Arc` stays
    /// valid (and immutable) across later refreshes.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Probe the current snapshot. First match in registration order wins.
    pub fn identify(&self, probe: &Embedding, tolerance: f32) -> MatchOutcome {
        FirstMatchMatcher.identify(probe, &self.snapshot(), tolerance)
    }

    /// Run one refresh cycle.
    ///
    /// Never fails and never panics: a store outage keeps the previous
    /// snapshot untouched, and each unusable record is skipped on its own.
    /// Safe to call concurrently with readers; idempotent against an
    /// unchanged store.
    pub async fn refresh(&self) {
        let documents = match self.adapter.fetch_all().await {
            Ok(documents) => documents,
            Err(err) => {
                tracing::warn!(error = %err, "store fetch failed; keeping previous snapshot");
                return;
            }
        };

        let fetched = documents.len();
        let mut entries = Vec::with_capacity(fetched);
        for doc in documents {
            match record::normalize(&doc.value, &self.embedder) {
                Ok(Normalized::Canonical(embedding)) => {
                    entries.push(FaceRecord { name: doc.name, embedding });
                }
                Ok(Normalized::Reencoded(embedding)) => {
                    // Lazy migration: rewrite so the next cycle takes the
                    // cheap path. The write may fail; the snapshot entry
                    // does not depend on it.
                    self.adapter.persist_canonical(&doc.name, &embedding).await;
                    entries.push(FaceRecord { name: doc.name, embedding });
                }
                Err(err) => {
                    tracing::warn!(name = %doc.name, error = %err, "skipping unusable record");
                }
            }
        }

        let mut published = self.snapshot.write();
        // Count-based change signal only: two different same-size sets keep
        // the same version. Diagnostics, not correctness.
        let changed = entries.len() != published.entries.len();
        let version = if changed { published.version + 1 } else { published.version };
        if changed {
            tracing::info!(known = entries.len(), fetched, version, "known-face set changed");
        } else {
            tracing::debug!(known = entries.len(), fetched, "known-face set refreshed");
        }
        *published = Arc::new(Snapshot { entries, version });
    }
}

/// Spawn the background refresh task.
///
/// Ticks immediately (initial population), then every `period`. Runs until
/// the handle is aborted or the runtime shuts down; no refresh error can
/// terminate it.
pub fn spawn_refresh_loop<S, E>(
    cache: Arc<FaceCache<S, E>>,
    period: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: DocumentStore + 'static,
    E: FaceEmbedder + 'static,
{
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs(), "known-face refresh task started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            cache.refresh().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{decode_canonical, encode_canonical};
    use crate::store::{RawDocument, RawStoredValue, StoreError};
    use async_trait::async_trait;
    use mien_core::engine::FaceBox;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store fake with a switchable outage mode.
    #[derive(Default)]
    struct FakeStore {
        docs: Mutex<Vec<(String, RawStoredValue)>>,
        unavailable: AtomicBool,
    }

    impl FakeStore {
        fn with_docs(docs: Vec<(&str, RawStoredValue)>) -> Self {
            Self {
                docs: Mutex::new(
                    docs.into_iter().map(|(n, v)| (n.to_owned(), v)).collect(),
                ),
                unavailable: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected outage".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn fetch_all(&self) -> Result<Vec<RawDocument>, StoreError> {
            self.check()?;
            Ok(self
                .docs
                .lock()
                .iter()
                .map(|(name, value)| RawDocument {
                    name: name.clone(),
                    value: value.clone(),
                    registered_at: None,
                })
                .collect())
        }

        async fn fetch_one(&self, name: &str) -> Result<Option<RawStoredValue>, StoreError> {
            self.check()?;
            Ok(self
                .docs
                .lock()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()))
        }

        async fn insert(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError> {
            self.check()?;
            let mut docs = self.docs.lock();
            if docs.iter().any(|(n, _)| n == name) {
                return Err(StoreError::DuplicateName(name.to_owned()));
            }
            docs.push((name.to_owned(), value));
            Ok(())
        }

        async fn update(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError> {
            self.check()?;
            let mut docs = self.docs.lock();
            match docs.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => {
                    slot.1 = value;
                    Ok(())
                }
                None => Err(StoreError::NotFound(name.to_owned())),
            }
        }

        async fn remove(&self, name: &str) -> Result<bool, StoreError> {
            self.check()?;
            let mut docs = self.docs.lock();
            let before = docs.len();
            docs.retain(|(n, _)| n != name);
            Ok(docs.len() != before)
        }
    }

    /// One face per image, fixed embedding.
    struct StubEmbedder(Vec<f32>);

    impl FaceEmbedder for StubEmbedder {
        fn locate_faces(&self, _image: &image::RgbImage) -> Vec<FaceBox> {
            vec![FaceBox { x: 0.0, y: 0.0, width: 2.0, height: 2.0, confidence: 0.9 }]
        }

        fn embed_faces(&self, _image: &image::RgbImage, boxes: &[FaceBox]) -> Vec<Embedding> {
            boxes.iter().map(|_| Embedding::new(self.0.clone())).collect()
        }
    }

    fn canonical(values: Vec<f32>) -> RawStoredValue {
        RawStoredValue::Binary(encode_canonical(&Embedding::new(values)).unwrap())
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn cache_over(store: FakeStore) -> FaceCache<FakeStore, StubEmbedder> {
        FaceCache::new(EmbeddingStore::new(store), StubEmbedder(vec![0.5; 4]))
    }

    #[tokio::test]
    async fn test_starts_empty_and_populates_on_refresh() {
        let cache = cache_over(FakeStore::with_docs(vec![
            ("ada", canonical(vec![0.1; 4])),
            ("mia", canonical(vec![0.9; 4])),
        ]));
        assert!(cache.snapshot().is_empty());

        cache.refresh().await;
        let snap = cache.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.entries[0].name, "ada");
        assert_eq!(snap.entries[1].name, "mia");
        assert_eq!(snap.version, 1);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent_against_unchanged_store() {
        let cache = cache_over(FakeStore::with_docs(vec![
            ("ada", canonical(vec![0.1; 4])),
            ("mia", canonical(vec![0.9; 4])),
        ]));
        cache.refresh().await;
        let first = cache.snapshot();
        cache.refresh().await;
        let second = cache.snapshot();
        // Same names, same vectors, same order, same version.
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_one_bad_record_skipped_not_fatal() {
        let cache = cache_over(FakeStore::with_docs(vec![
            ("ada", canonical(vec![0.1; 4])),
            ("broken", RawStoredValue::Binary(vec![0xde, 0xad, 0xbe, 0xef])),
            ("mia", canonical(vec![0.9; 4])),
        ]));
        cache.refresh().await;
        let snap = cache.snapshot();
        assert_eq!(snap.len(), 2);
        let names: Vec<_> = snap.entries.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ada", "mia"]);
    }

    #[tokio::test]
    async fn test_outage_retains_previous_snapshot() {
        let cache = cache_over(FakeStore::with_docs(vec![(
            "ada",
            canonical(vec![0.1; 4]),
        )]));
        cache.refresh().await;
        let before = cache.snapshot();

        cache.adapter().inner().unavailable.store(true, Ordering::SeqCst);
        cache.refresh().await;
        let after = cache.snapshot();
        assert_eq!(*before, *after);
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn test_version_bumps_only_on_count_change() {
        let store = FakeStore::with_docs(vec![("ada", canonical(vec![0.1; 4]))]);
        let cache = cache_over(store);
        cache.refresh().await;
        assert_eq!(cache.snapshot().version, 1);

        // Same size, different content: version must NOT move (count proxy).
        cache
            .adapter()
            .inner()
            .update("ada", canonical(vec![0.7; 4]))
            .await
            .unwrap();
        cache.refresh().await;
        let snap = cache.snapshot();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.entries[0].embedding.values, vec![0.7; 4]);

        // Size change: version moves.
        cache
            .adapter()
            .inner()
            .insert("mia", canonical(vec![0.9; 4]))
            .await
            .unwrap();
        cache.refresh().await;
        assert_eq!(cache.snapshot().version, 2);
    }

    #[tokio::test]
    async fn test_legacy_record_migrated_and_visible_same_cycle() {
        let cache = cache_over(FakeStore::with_docs(vec![(
            "legacy",
            RawStoredValue::Binary(png_bytes()),
        )]));
        cache.refresh().await;

        // The cycle that computed the fallback embedding already serves it.
        let snap = cache.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.entries[0].embedding.values, vec![0.5; 4]);

        // And the store copy is now canonical.
        let stored = cache
            .adapter()
            .inner()
            .fetch_one("legacy")
            .await
            .unwrap()
            .unwrap();
        let RawStoredValue::Binary(payload) = stored else {
            panic!("expected blob after migration");
        };
        assert_eq!(
            decode_canonical(&payload),
            Some(Embedding::new(vec![0.5; 4]))
        );
    }

    #[tokio::test]
    async fn test_snapshot_arc_stays_stable_across_refresh() {
        let cache = cache_over(FakeStore::with_docs(vec![(
            "ada",
            canonical(vec![0.1; 4]),
        )]));
        cache.refresh().await;
        let held = cache.snapshot();

        cache
            .adapter()
            .inner()
            .insert("mia", canonical(vec![0.9; 4]))
            .await
            .unwrap();
        cache.refresh().await;

        // The reader's old view is immutable; the new view is published.
        assert_eq!(held.len(), 1);
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_identify_through_cache() {
        let cache = cache_over(FakeStore::with_docs(vec![
            ("ada", canonical(vec![0.0; 4])),
            ("mia", canonical(vec![1.0; 4])),
        ]));
        cache.refresh().await;
        assert_eq!(
            cache.identify(&Embedding::new(vec![0.0; 4]), 0.6),
            MatchOutcome::Identified { name: "ada".into() }
        );
        assert_eq!(
            cache.identify(&Embedding::new(vec![10.0; 4]), 0.6),
            MatchOutcome::Unknown
        );
    }
}
