// src/store.rs
//! Storage seam. The pipeline only ever talks to [`Datastore`]; the bundled
//! [`MemoryStore`] backs tests and the demo binary, a real deployment plugs
//! a database behind the same trait.
//!
//! `replace_recommendations` is the idempotency primitive: it removes every
//! recommendation for the (business, article) pair and inserts the new set
//! as one operation, so implementations must make the two steps atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{Article, Business, FeatureRecord, Recommendation};

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn put_article(&self, article: Article) -> anyhow::Result<()>;
    async fn article(&self, id: u64) -> anyhow::Result<Option<Article>>;
    /// Record the outcome of a processing attempt on the article flags.
    async fn mark_processed(&self, id: u64, error: Option<String>) -> anyhow::Result<()>;
    /// Articles whose last processing attempt recorded an error.
    async fn failed_articles(&self) -> anyhow::Result<Vec<Article>>;

    /// Store the current feature record for an article, replacing any
    /// previous record wholesale.
    async fn replace_features(&self, article_id: u64, record: FeatureRecord)
        -> anyhow::Result<()>;
    async fn features(&self, article_id: u64) -> anyhow::Result<Option<FeatureRecord>>;

    async fn put_business(&self, business: Business) -> anyhow::Result<()>;
    async fn active_businesses(&self) -> anyhow::Result<Vec<Business>>;

    /// Delete-then-insert for one (business, article) pair, atomically.
    async fn replace_recommendations(
        &self,
        business_id: u64,
        article_id: u64,
        recs: Vec<Recommendation>,
    ) -> anyhow::Result<()>;
    async fn recommendations_for_article(&self, article_id: u64)
        -> anyhow::Result<Vec<Recommendation>>;
}

#[derive(Default)]
struct Inner {
    articles: HashMap<u64, Article>,
    features: HashMap<u64, FeatureRecord>,
    businesses: HashMap<u64, Business>,
    recommendations: Vec<Recommendation>,
}

/// In-memory store behind one mutex; every trait method is a single lock
/// acquisition, which is what makes the replace atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store mutex poisoned"))
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn put_article(&self, article: Article) -> anyhow::Result<()> {
        self.lock()?.articles.insert(article.id, article);
        Ok(())
    }

    async fn article(&self, id: u64) -> anyhow::Result<Option<Article>> {
        Ok(self.lock()?.articles.get(&id).cloned())
    }

    async fn mark_processed(&self, id: u64, error: Option<String>) -> anyhow::Result<()> {
        let mut g = self.lock()?;
        let article = g
            .articles
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("unknown article {id}"))?;
        article.processed = true;
        article.processing_error = error;
        Ok(())
    }

    async fn failed_articles(&self) -> anyhow::Result<Vec<Article>> {
        let mut v: Vec<Article> = self
            .lock()?
            .articles
            .values()
            .filter(|a| a.processed && a.processing_error.is_some())
            .cloned()
            .collect();
        v.sort_by_key(|a| a.id);
        Ok(v)
    }

    async fn replace_features(
        &self,
        article_id: u64,
        record: FeatureRecord,
    ) -> anyhow::Result<()> {
        self.lock()?.features.insert(article_id, record);
        Ok(())
    }

    async fn features(&self, article_id: u64) -> anyhow::Result<Option<FeatureRecord>> {
        Ok(self.lock()?.features.get(&article_id).cloned())
    }

    async fn put_business(&self, business: Business) -> anyhow::Result<()> {
        self.lock()?.businesses.insert(business.id, business);
        Ok(())
    }

    async fn active_businesses(&self) -> anyhow::Result<Vec<Business>> {
        let mut v: Vec<Business> = self
            .lock()?
            .businesses
            .values()
            .filter(|b| b.active)
            .cloned()
            .collect();
        v.sort_by_key(|b| b.id);
        Ok(v)
    }

    async fn replace_recommendations(
        &self,
        business_id: u64,
        article_id: u64,
        recs: Vec<Recommendation>,
    ) -> anyhow::Result<()> {
        let mut g = self.lock()?;
        g.recommendations
            .retain(|r| !(r.business_id == business_id && r.article_id == article_id));
        g.recommendations.extend(recs);
        Ok(())
    }

    async fn recommendations_for_article(
        &self,
        article_id: u64,
    ) -> anyhow::Result<Vec<Recommendation>> {
        Ok(self
            .lock()?
            .recommendations
            .iter()
            .filter(|r| r.article_id == article_id)
            .cloned()
            .collect())
    }
}
