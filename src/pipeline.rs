// src/pipeline.rs
//! Processing pipeline for one article: extract features, consult the
//! augmentation collaborator when the record is too sparse, prefilter, score
//! every active business, and write recommendations with delete-then-insert.
//!
//! The pipeline grabs one config snapshot at the start of a run and uses it
//! throughout, so a reload mid-run never produces a record scored against
//! two different configurations.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::augment::AugmentProvider;
use crate::broadcast;
use crate::config::ConfigHandle;
use crate::error::ProcessError;
use crate::extract;
use crate::metrics as m;
use crate::normalize::{fold_for_matching, full_text};
use crate::recommend;
use crate::relevance;
use crate::store::Datastore;
use crate::types::Article;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSummary {
    pub article_id: u64,
    /// True when a duplicate delivery of an already-processed article was
    /// dropped without running the pipeline.
    pub skipped: bool,
    /// Hard prefilter gate that rejected the article, if any.
    pub rejected: Option<&'static str>,
    pub suitable: bool,
    pub completeness: f32,
    pub augmented: bool,
    pub businesses_scored: usize,
    pub recommendations: usize,
}

pub struct Pipeline {
    store: Arc<dyn Datastore>,
    config: ConfigHandle,
    augment: Arc<dyn AugmentProvider>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Datastore>,
        config: ConfigHandle,
        augment: Arc<dyn AugmentProvider>,
    ) -> Self {
        m::register();
        Self {
            store,
            config,
            augment,
        }
    }

    /// Fetch and process an article by id. Unknown ids are permanent
    /// failures; the worker must not retry them. Duplicate deliveries of an
    /// article that already processed cleanly are dropped; use
    /// [`Pipeline::reprocess`] to force a fresh pass.
    pub async fn process(&self, article_id: u64) -> Result<ProcessSummary, ProcessError> {
        let article = self.fetch(article_id).await?;
        if article.processed && article.processing_error.is_none() {
            counter!(m::ARTICLES_SKIPPED).increment(1);
            info!(target: "pipeline", article_id, "already processed, skipping duplicate");
            return Ok(ProcessSummary {
                article_id,
                skipped: true,
                ..Default::default()
            });
        }
        self.process_article(&article).await
    }

    /// Process an article unconditionally, even if a previous run completed.
    /// Used after config or business changes that should reshape results.
    pub async fn reprocess(&self, article_id: u64) -> Result<ProcessSummary, ProcessError> {
        let article = self.fetch(article_id).await?;
        self.process_article(&article).await
    }

    /// Sweep every article whose last attempt recorded an error and run it
    /// again. Articles that fail again are logged and left for the next
    /// sweep.
    pub async fn reprocess_failed(&self) -> Result<Vec<ProcessSummary>, ProcessError> {
        let failed = self
            .store
            .failed_articles()
            .await
            .map_err(|e| ProcessError::Storage(e.to_string()))?;
        let mut summaries = Vec::with_capacity(failed.len());
        for article in &failed {
            match self.process_article(article).await {
                Ok(s) => summaries.push(s),
                Err(e) => {
                    warn!(
                        target: "pipeline",
                        article_id = article.id,
                        error = %e,
                        "reprocess sweep: article failed again"
                    );
                }
            }
        }
        Ok(summaries)
    }

    async fn fetch(&self, article_id: u64) -> Result<Article, ProcessError> {
        self.store
            .article(article_id)
            .await
            .map_err(|e| ProcessError::Storage(e.to_string()))?
            .ok_or_else(|| ProcessError::Permanent(format!("unknown article {article_id}")))
    }

    /// Run the full pipeline over one article. Reprocessing is safe: the
    /// feature record is replaced wholesale and recommendations go through
    /// delete-then-insert per (business, article) pair.
    pub async fn process_article(&self, article: &Article) -> Result<ProcessSummary, ProcessError> {
        let started = Instant::now();
        let cfg = self.config.current();
        let text = full_text(&article.title, &article.content);
        let folded = fold_for_matching(&text);

        let mut record = extract::extract(article, &cfg);

        // Sparse record: ask the collaborator, merge gaps-only.
        let mut augmented = false;
        if record.completeness < cfg.thresholds.augment_completeness {
            counter!(m::ARTICLES_AUGMENTED, "provider" => self.augment.name()).increment(1);
            // The collaborator being down must not stall the article; local
            // extraction stands on its own.
            match self.augment.augment(article).await {
                Ok(facts) if !facts.is_empty() => {
                    extract::merge_augmented(&mut record, &facts);
                    // Attendance or type may have arrived; broadcastability
                    // is recomputed against the same snapshot.
                    let bc = broadcast::assess(
                        &folded,
                        record.event_type.as_deref(),
                        record.attendance,
                        &cfg,
                    );
                    record.sport_type = record.sport_type.take().or(bc.sport_type);
                    record.competition_level =
                        record.competition_level.take().or(bc.competition_level);
                    record.hype_score = bc.hype_score;
                    record.broadcastability = bc.score;
                    record.is_broadcastable = bc.is_broadcastable;
                    record.completeness = extract::completeness(&record);
                    augmented = true;
                }
                Ok(_) => {}
                Err(e) => {
                    counter!(m::AUGMENT_FAILURES, "provider" => self.augment.name()).increment(1);
                    warn!(
                        target: "pipeline",
                        article_id = article.id,
                        error = %e,
                        "augmentation failed, continuing with local extraction"
                    );
                }
            }
        }

        let pre = relevance::prefilter(&record, &folded, article.published_at, Utc::now(), &cfg);
        let completeness = record.completeness;
        self.store
            .replace_features(article.id, record.clone())
            .await
            .map_err(|e| ProcessError::Storage(e.to_string()))?;

        let businesses = self
            .store
            .active_businesses()
            .await
            .map_err(|e| ProcessError::Storage(e.to_string()))?;

        let mut emitted = 0usize;
        let now = Utc::now();
        for business in &businesses {
            // Pairs below the bar still go through the replace so stale
            // recommendations from earlier runs are cleared. Broadcastable
            // events keep scoring even when article suitability is low
            // (typically the international row); the override needs them.
            let scorable = pre.suitable || record.is_broadcastable;
            let recs = if pre.rejected.is_none() && scorable {
                let outcome =
                    relevance::score_business(&record, pre.suitability, business, &folded, &cfg);
                if outcome.score >= cfg.thresholds.relevance {
                    recommend::generate(business, article.id, &record, &outcome, now)
                } else {
                    Vec::new()
                }
            } else {
                Vec::new()
            };
            emitted += recs.len();
            self.store
                .replace_recommendations(business.id, article.id, recs)
                .await
                .map_err(|e| ProcessError::Storage(e.to_string()))?;
        }

        self.store
            .mark_processed(article.id, None)
            .await
            .map_err(|e| ProcessError::Storage(e.to_string()))?;

        if let Some(reason) = pre.rejected {
            counter!(m::ARTICLES_REJECTED, "reason" => reason).increment(1);
        }
        counter!(m::ARTICLES_PROCESSED, "outcome" => "ok").increment(1);
        counter!(m::RECOMMENDATIONS_EMITTED).increment(emitted as u64);
        histogram!(m::PROCESSING_SECONDS).record(started.elapsed().as_secs_f64());

        if pre.rejected.is_some() {
            warn!(
                target: "pipeline",
                article_id = article.id,
                reason = pre.rejected.unwrap_or("-"),
                "article rejected by prefilter"
            );
        } else {
            info!(
                target: "pipeline",
                article_id = article.id,
                suitable = pre.suitable,
                completeness = completeness,
                augmented = augmented,
                recommendations = emitted,
                config_version = cfg.version,
                "article processed"
            );
        }

        Ok(ProcessSummary {
            article_id: article.id,
            skipped: false,
            rejected: pre.rejected,
            suitable: pre.suitable,
            completeness,
            augmented,
            businesses_scored: businesses.len(),
            recommendations: emitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{AugmentedFacts, DisabledProvider, MockProvider};
    use crate::config::ConfigSnapshot;
    use crate::store::MemoryStore;
    use crate::types::Business;
    use chrono::Duration;

    const EXT_TOML: &str = r#"
[suitability]
sports_match = 0.85
concert = 0.85
festival = 0.90
politics = 0.15
international = 0.10
"#;

    const BC_TOML: &str = r#"
[[sports]]
code = "soccer"
appeal = 0.95
keywords = ["futbol", "partido"]

[[competitions]]
code = "world_cup"
sport = "soccer"
multiplier = 3.0
keywords = ["mundial"]

[[hype]]
pattern = "historico|imperdible"
boost = 0.3
category = "superlatives"
"#;

    fn handle() -> ConfigHandle {
        ConfigHandle::new(ConfigSnapshot::from_toml_strs(EXT_TOML, BC_TOML, 1).unwrap())
    }

    fn pub_with_screens(id: u64, city: &str) -> Business {
        let mut b = Business::new(id, "La Tribuna", "pub", city);
        b.screen_broadcast = true;
        b
    }

    async fn seeded_pipeline(articles: Vec<Article>, businesses: Vec<Business>) -> Pipeline {
        let store = Arc::new(MemoryStore::new());
        for a in articles {
            store.put_article(a).await.unwrap();
        }
        for b in businesses {
            store.put_business(b).await.unwrap();
        }
        Pipeline::new(store, handle(), Arc::new(DisabledProvider))
    }

    fn match_article(id: u64) -> Article {
        Article::new(
            id,
            "Partido de fútbol Colombia vs Brasil",
            "El clásico se jugará el domingo en el Estadio Atanasio Girardot de \
             Medellín con 35.000 asistentes. Un partido histórico del mundial de fútbol.",
            Utc::now() - Duration::days(1),
        )
    }

    #[tokio::test]
    async fn local_match_emits_recommendations() {
        let p = seeded_pipeline(vec![match_article(1)], vec![pub_with_screens(1, "Medellín")]).await;
        let s = p.process(1).await.unwrap();
        assert!(s.suitable);
        assert!(s.recommendations > 0);
        assert_eq!(s.businesses_scored, 1);
    }

    #[tokio::test]
    async fn reprocessing_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.put_article(match_article(1)).await.unwrap();
        store.put_business(pub_with_screens(1, "Medellín")).await.unwrap();
        let p = Pipeline::new(store.clone(), handle(), Arc::new(DisabledProvider));

        let first = p.process(1).await.unwrap();
        for _ in 0..3 {
            let again = p.reprocess(1).await.unwrap();
            assert_eq!(again.recommendations, first.recommendations);
        }
        let stored = store.recommendations_for_article(1).await.unwrap();
        assert_eq!(stored.len(), first.recommendations);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.put_article(match_article(1)).await.unwrap();
        store.put_business(pub_with_screens(1, "Medellín")).await.unwrap();
        let p = Pipeline::new(store.clone(), handle(), Arc::new(DisabledProvider));

        let first = p.process(1).await.unwrap();
        assert!(!first.skipped);
        assert!(first.recommendations > 0);

        // Same id delivered again: dropped, stored results untouched.
        let again = p.process(1).await.unwrap();
        assert!(again.skipped);
        assert_eq!(again.recommendations, 0);
        let stored = store.recommendations_for_article(1).await.unwrap();
        assert_eq!(stored.len(), first.recommendations);
    }

    #[tokio::test]
    async fn reprocess_failed_sweeps_errored_articles() {
        let store = Arc::new(MemoryStore::new());
        store.put_article(match_article(1)).await.unwrap();
        store.put_article(match_article(2)).await.unwrap();
        store.put_business(pub_with_screens(1, "Medellín")).await.unwrap();
        let p = Pipeline::new(store.clone(), handle(), Arc::new(DisabledProvider));

        // Article 1 ended a previous attempt with an error; 2 is clean.
        store.mark_processed(1, Some("timeout".into())).await.unwrap();
        p.process(2).await.unwrap();

        let summaries = p.reprocess_failed().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].article_id, 1);
        assert!(summaries[0].recommendations > 0);
        let a = store.article(1).await.unwrap().unwrap();
        assert!(a.processed);
        assert_eq!(a.processing_error, None);
        assert!(store.failed_articles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_article_clears_previous_recommendations() {
        let store = Arc::new(MemoryStore::new());
        let mut a = match_article(1);
        store.put_article(a.clone()).await.unwrap();
        store.put_business(pub_with_screens(1, "Medellín")).await.unwrap();
        let p = Pipeline::new(store.clone(), handle(), Arc::new(DisabledProvider));
        assert!(p.process(1).await.unwrap().recommendations > 0);

        // Same article, now past the age gate.
        a.published_at = Utc::now() - Duration::days(60);
        store.put_article(a).await.unwrap();
        let s = p.reprocess(1).await.unwrap();
        assert_eq!(s.rejected, Some("article_too_old"));
        assert!(store.recommendations_for_article(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn augmentation_fills_gaps_for_sparse_articles() {
        let store = Arc::new(MemoryStore::new());
        let a = Article::new(
            7,
            "Gran concierto imperdible",
            "La banda se presenta pronto en la ciudad, mas detalles en nuestra pagina.",
            Utc::now() - Duration::days(1),
        );
        store.put_article(a).await.unwrap();
        store.put_business(Business::new(1, "La Tribuna", "pub", "Medellín")).await.unwrap();

        let facts = AugmentedFacts {
            city: Some("Medellín".to_string()),
            venue: Some("Teatro Metropolitano".to_string()),
            attendance: Some(4_000),
            ..Default::default()
        };
        let p = Pipeline::new(store.clone(), handle(), Arc::new(MockProvider::returning(facts)));
        let s = p.process(7).await.unwrap();
        assert!(s.augmented);

        let r = store.features(7).await.unwrap().unwrap();
        assert_eq!(r.city.as_deref(), Some("Medellín"));
        assert_eq!(r.venue.as_deref(), Some("Teatro Metropolitano"));
        // With the city filled, the geo gate passes and the pub matches.
        assert!(s.recommendations > 0);
    }

    #[tokio::test]
    async fn augmentation_failure_keeps_local_results() {
        let store = Arc::new(MemoryStore::new());
        // Sparse enough to ask the collaborator, rich enough to score.
        let a = Article::new(
            7,
            "Gran concierto imperdible",
            "La banda se presenta el sábado en el Teatro Metropolitano de Medellín.",
            Utc::now() - Duration::days(1),
        );
        store.put_article(a).await.unwrap();
        store.put_business(pub_with_screens(1, "Medellín")).await.unwrap();
        let p = Pipeline::new(store.clone(), handle(), Arc::new(MockProvider::failing("offline")));

        // The collaborator is down; local extraction carries the article.
        let s = p.process(7).await.unwrap();
        assert!(!s.augmented);
        assert!(s.recommendations > 0);
        assert!(store.features(7).await.unwrap().is_some());
        let a = store.article(7).await.unwrap().unwrap();
        assert!(a.processed);
        assert_eq!(a.processing_error, None);
    }

    #[tokio::test]
    async fn broadcast_override_reaches_far_away_screens() {
        let a = Article::new(
            3,
            "Final del mundial de fútbol",
            "Un partido histórico del mundial se jugará en el Estadio Lusail de Doha \
             con 80.000 asistentes y millones de espectadores en el mundo entero.",
            Utc::now() - Duration::days(1),
        );
        let p = seeded_pipeline(vec![a], vec![pub_with_screens(1, "Medellín")]).await;
        let s = p.process(3).await.unwrap();
        assert!(s.recommendations > 0);
    }

    #[tokio::test]
    async fn unknown_article_is_permanent() {
        let p = seeded_pipeline(vec![], vec![]).await;
        let err = p.process(999).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
