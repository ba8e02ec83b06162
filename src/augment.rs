// src/augment.rs
//! Augmentation collaborator seam. When local extraction leaves a record
//! below the completeness threshold, the pipeline asks a provider for
//! additional facts and merges them gaps-only. Providers:
//!   - `DisabledProvider`: augmentation off, always returns nothing.
//!   - `HttpProvider`: posts the article to an external enrichment service.
//!   - `MockProvider` (tests): canned facts.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProcessError;
use crate::relevance::anon_hash;
use crate::types::Article;

/// Partial facts from a collaborator. Everything optional; the merge in the
/// extraction layer only fills fields the local pass left empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugmentedFacts {
    pub event_type: Option<String>,
    pub event_subtype: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub venue: Option<String>,
    pub event_country: Option<String>,
    pub event_start: Option<DateTime<Utc>>,
    pub event_end: Option<DateTime<Utc>>,
    pub duration_hours: Option<f32>,
    pub attendance: Option<u64>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AugmentedFacts {
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none()
            && self.event_subtype.is_none()
            && self.city.is_none()
            && self.neighborhood.is_none()
            && self.venue.is_none()
            && self.event_country.is_none()
            && self.event_start.is_none()
            && self.event_end.is_none()
            && self.duration_hours.is_none()
            && self.attendance.is_none()
            && self.keywords.is_empty()
    }
}

#[async_trait]
pub trait AugmentProvider: Send + Sync {
    async fn augment(&self, article: &Article) -> Result<AugmentedFacts, ProcessError>;
    fn name(&self) -> &'static str;
}

/// No-op provider for deployments without an enrichment service.
pub struct DisabledProvider;

#[async_trait]
impl AugmentProvider for DisabledProvider {
    async fn augment(&self, _article: &Article) -> Result<AugmentedFacts, ProcessError> {
        Ok(AugmentedFacts::default())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Serialize)]
struct AugmentRequest<'a> {
    title: &'a str,
    content: &'a str,
    url: &'a str,
}

/// Calls an external enrichment endpoint. The service receives the raw
/// article and answers with [`AugmentedFacts`] JSON.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        // A hung enrichment service must not hold an article slot open; the
        // worker has its own outer timeout but the socket should give up
        // first.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AugmentProvider for HttpProvider {
    async fn augment(&self, article: &Article) -> Result<AugmentedFacts, ProcessError> {
        let req = AugmentRequest {
            title: &article.title,
            content: &article.content,
            url: &article.url,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(|e| ProcessError::AugmentationUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ProcessError::AugmentationUnavailable(format!(
                "status {}",
                resp.status()
            )));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProcessError::AugmentationUnavailable(e.to_string()))?;
        let facts: AugmentedFacts = serde_json::from_slice(&body)
            .map_err(|e| ProcessError::AugmentationUnavailable(format!("bad response: {e}")))?;
        debug!(
            target: "augment",
            article_id = article.id,
            text_hash = anon_hash(&article.content),
            empty = facts.is_empty(),
            "augmentation response received"
        );
        Ok(facts)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Canned provider for tests: fixed facts, optional fixed failure.
pub struct MockProvider {
    pub facts: AugmentedFacts,
    pub fail_with: Option<String>,
}

impl MockProvider {
    pub fn returning(facts: AugmentedFacts) -> Self {
        Self {
            facts,
            fail_with: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            facts: AugmentedFacts::default(),
            fail_with: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl AugmentProvider for MockProvider {
    async fn augment(&self, _article: &Article) -> Result<AugmentedFacts, ProcessError> {
        match &self.fail_with {
            Some(reason) => Err(ProcessError::AugmentationUnavailable(reason.clone())),
            None => Ok(self.facts.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
