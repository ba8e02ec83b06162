// src/worker.rs
//! Background worker: consumes article ids from a channel and drives the
//! pipeline with debounce, a per-article timeout, and bounded retries.
//!
//! The debounce gives upstream ingestion a moment to finish writing related
//! rows before extraction reads the article. Retry backoff is exponential
//! with a deterministic jitter derived from the article id, so a burst of
//! failing articles does not retry in lockstep.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::ProcessError;
use crate::metrics as m;
use crate::pipeline::Pipeline;
use crate::store::Datastore;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub debounce: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

pub struct Worker {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Datastore>,
    cfg: WorkerConfig,
}

impl Worker {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<dyn Datastore>, cfg: WorkerConfig) -> Self {
        Self {
            pipeline,
            store,
            cfg,
        }
    }

    /// Consume article ids until the channel closes.
    pub fn spawn(self, mut rx: mpsc::Receiver<u64>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(article_id) = rx.recv().await {
                tokio::time::sleep(self.cfg.debounce).await;
                self.process_with_retries(article_id).await;
            }
            info!(target: "worker", "queue closed, worker stopping");
        })
    }

    /// One article, up to `max_retries` additional attempts on retryable
    /// errors. A final failure is recorded on the article itself.
    pub async fn process_with_retries(&self, article_id: u64) {
        let mut attempt = 0u32;
        loop {
            let result = tokio::time::timeout(self.cfg.timeout, self.pipeline.process(article_id))
                .await
                .unwrap_or(Err(ProcessError::Timeout(self.cfg.timeout)));

            match result {
                Ok(_) => return,
                Err(e) if e.is_retryable() && attempt < self.cfg.max_retries => {
                    attempt += 1;
                    counter!(m::PROCESSING_RETRIES).increment(1);
                    let delay = self.backoff(article_id, attempt);
                    warn!(
                        target: "worker",
                        article_id = article_id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retryable processing failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        target: "worker",
                        article_id = article_id,
                        attempts = attempt + 1,
                        error = %e,
                        "processing failed, recording error"
                    );
                    counter!(m::ARTICLES_PROCESSED, "outcome" => "error").increment(1);
                    if let Err(se) = self
                        .store
                        .mark_processed(article_id, Some(e.to_string()))
                        .await
                    {
                        error!(
                            target: "worker",
                            article_id = article_id,
                            error = %se,
                            "failed to record processing error"
                        );
                    }
                    return;
                }
            }
        }
    }

    /// Exponential backoff with deterministic jitter (no rand dependency;
    /// a hash of id and attempt spreads retries well enough).
    fn backoff(&self, article_id: u64, attempt: u32) -> Duration {
        let base = self.cfg.backoff_base * 2u32.saturating_pow(attempt - 1);
        let mut h = DefaultHasher::new();
        (article_id, attempt).hash(&mut h);
        let jitter_ms = h.finish() % 1_000;
        base + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::DisabledProvider;
    use crate::config::{ConfigHandle, ConfigSnapshot};
    use crate::store::MemoryStore;
    use crate::types::{Article, Business, FeatureRecord, Recommendation};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store whose `article` lookups fail a fixed number of times before
    /// recovering, standing in for a database blip.
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures_left: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl Datastore for FlakyStore {
        async fn put_article(&self, article: Article) -> anyhow::Result<()> {
            self.inner.put_article(article).await
        }

        async fn article(&self, id: u64) -> anyhow::Result<Option<Article>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                anyhow::bail!("simulated outage");
            }
            self.inner.article(id).await
        }

        async fn mark_processed(&self, id: u64, error: Option<String>) -> anyhow::Result<()> {
            self.inner.mark_processed(id, error).await
        }

        async fn failed_articles(&self) -> anyhow::Result<Vec<Article>> {
            self.inner.failed_articles().await
        }

        async fn replace_features(
            &self,
            article_id: u64,
            record: FeatureRecord,
        ) -> anyhow::Result<()> {
            self.inner.replace_features(article_id, record).await
        }

        async fn features(&self, article_id: u64) -> anyhow::Result<Option<FeatureRecord>> {
            self.inner.features(article_id).await
        }

        async fn put_business(&self, business: Business) -> anyhow::Result<()> {
            self.inner.put_business(business).await
        }

        async fn active_businesses(&self) -> anyhow::Result<Vec<Business>> {
            self.inner.active_businesses().await
        }

        async fn replace_recommendations(
            &self,
            business_id: u64,
            article_id: u64,
            recs: Vec<Recommendation>,
        ) -> anyhow::Result<()> {
            self.inner
                .replace_recommendations(business_id, article_id, recs)
                .await
        }

        async fn recommendations_for_article(
            &self,
            article_id: u64,
        ) -> anyhow::Result<Vec<Recommendation>> {
            self.inner.recommendations_for_article(article_id).await
        }
    }

    fn fast_cfg() -> WorkerConfig {
        WorkerConfig {
            debounce: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
            max_retries: 2,
            backoff_base: Duration::from_millis(1),
        }
    }

    fn article(id: u64) -> Article {
        Article::new(
            id,
            "Festival de música",
            "Gran festival de música este sábado en el Parque Norte de Medellín \
             con bandas locales y 2.000 asistentes esperados.",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn worker_processes_queue_and_stops_on_close() {
        let store = Arc::new(MemoryStore::new());
        store.put_article(article(1)).await.unwrap();
        store.put_article(article(2)).await.unwrap();
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            ConfigHandle::new(ConfigSnapshot::builtin()),
            Arc::new(DisabledProvider),
        ));

        let (tx, rx) = mpsc::channel(8);
        let handle = Worker::new(pipeline, store.clone(), fast_cfg()).spawn(rx);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(store.article(1).await.unwrap().unwrap().processed);
        assert!(store.article(2).await.unwrap().unwrap().processed);
    }

    #[tokio::test]
    async fn transient_storage_failure_is_retried() {
        let store = Arc::new(FlakyStore::new(1));
        store.put_article(article(9)).await.unwrap();
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            ConfigHandle::new(ConfigSnapshot::builtin()),
            Arc::new(DisabledProvider),
        ));

        let w = Worker::new(pipeline, store.clone(), fast_cfg());
        w.process_with_retries(9).await;

        let a = store.article(9).await.unwrap().unwrap();
        assert!(a.processed);
        assert_eq!(a.processing_error, None);
    }

    #[tokio::test]
    async fn retries_exhausted_record_the_error() {
        // Exactly as many failures as fast_cfg allows attempts (1 + 2
        // retries), so every attempt fails and the check below reads through.
        let store = Arc::new(FlakyStore::new(3));
        store.put_article(article(9)).await.unwrap();
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            ConfigHandle::new(ConfigSnapshot::builtin()),
            Arc::new(DisabledProvider),
        ));

        let w = Worker::new(pipeline, store.clone(), fast_cfg());
        w.process_with_retries(9).await;

        let a = store.article(9).await.unwrap().unwrap();
        assert!(a.processed);
        assert!(a
            .processing_error
            .as_deref()
            .unwrap()
            .contains("simulated outage"));
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            ConfigHandle::new(ConfigSnapshot::builtin()),
            Arc::new(DisabledProvider),
        ));
        let w = Worker::new(pipeline, store.clone(), fast_cfg());
        // Unknown article: permanent, so this returns promptly after one try.
        w.process_with_retries(404).await;
    }

    #[test]
    fn backoff_grows_and_carries_jitter() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            ConfigHandle::new(ConfigSnapshot::builtin()),
            Arc::new(DisabledProvider),
        ));
        let w = Worker::new(
            pipeline,
            store,
            WorkerConfig {
                backoff_base: Duration::from_secs(2),
                ..WorkerConfig::default()
            },
        );
        let b1 = w.backoff(1, 1);
        let b2 = w.backoff(1, 2);
        let b3 = w.backoff(1, 3);
        assert!(b1 >= Duration::from_secs(2) && b1 < Duration::from_secs(3));
        assert!(b2 >= Duration::from_secs(4) && b2 < Duration::from_secs(5));
        assert!(b3 >= Duration::from_secs(8) && b3 < Duration::from_secs(9));
    }
}
