// src/types.rs
//! Shared data model: articles, businesses, feature records, recommendations.
//!
//! Articles and businesses are owned by external subsystems; this core reads
//! their content and only ever writes back extraction results and processing
//! flags. `FeatureRecord` is the structured projection of one article and is
//! always replaced wholesale on reprocessing, never patched field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw input from the ingestion subsystem. Immutable content plus the two
/// processing flags this core maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// Source quality in [0,1], assigned by ingestion.
    pub source_reliability: f32,
    pub processed: bool,
    pub processing_error: Option<String>,
}

impl Article {
    pub fn new(id: u64, title: &str, content: &str, published_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.to_string(),
            content: content.to_string(),
            url: String::new(),
            published_at,
            source_reliability: 0.5,
            processed: false,
            processing_error: None,
        }
    }
}

/// Attendance-derived size bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScale {
    Small,
    Medium,
    Large,
    Massive,
}

impl EventScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventScale::Small => "small",
            EventScale::Medium => "medium",
            EventScale::Large => "large",
            EventScale::Massive => "massive",
        }
    }
}

/// Named entities pulled out of the text, grouped the way downstream
/// consumers expect them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    pub locations: Vec<String>,
    pub organizations: Vec<String>,
    pub people: Vec<String>,
}

impl EntitySet {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.organizations.is_empty() && self.people.is_empty()
    }
}

/// Structured projection of one article. Exactly one current record exists
/// per article; reprocessing replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub event_type: Option<String>,
    pub event_subtype: Option<String>,
    pub sport_type: Option<String>,
    pub competition_level: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub venue: Option<String>,
    pub event_country: Option<String>,
    /// True when the home country's teams/artists/athletes take part.
    pub national_involvement: bool,
    pub event_start: Option<DateTime<Utc>>,
    pub event_end: Option<DateTime<Utc>>,
    pub duration_hours: Option<f32>,
    pub attendance: Option<u64>,
    pub scale: Option<EventScale>,
    pub keywords: Vec<String>,
    pub entities: EntitySet,
    pub hype_score: f32,
    pub broadcastability: f32,
    pub is_broadcastable: bool,
    /// Fraction of the fixed checklist of fields that were populated.
    pub completeness: f32,
    /// Version of the configuration snapshot the record was extracted with.
    pub config_version: u64,
}

/// Weighted keyword owned by a business profile. Negative keywords subtract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessKeyword {
    pub keyword: String,
    pub weight: f32,
    #[serde(default)]
    pub negative: bool,
}

/// Read-only business profile from the business-management subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: u64,
    pub name: String,
    /// e.g. "pub", "restaurant", "coffee_shop", "bookstore"
    pub business_type: String,
    pub city: String,
    pub neighborhood: Option<String>,
    pub country: String,
    /// The business has screens and will show broadcast events.
    pub screen_broadcast: bool,
    pub include_national_events: bool,
    pub keywords: Vec<BusinessKeyword>,
    pub active: bool,
}

impl Business {
    pub fn new(id: u64, name: &str, business_type: &str, city: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            business_type: business_type.to_string(),
            city: city.to_string(),
            neighborhood: None,
            country: "Colombia".to_string(),
            screen_broadcast: false,
            include_national_events: false,
            keywords: Vec::new(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// One instantiated action for a (business, article) pair. Created only by
/// the recommendation generator; the live set for a pair is always the
/// output of the most recent generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub business_id: u64,
    pub article_id: u64,
    /// Coarse grouping: "marketing", "inventory", "staffing", "operations", "partnerships"
    pub category: String,
    pub action_type: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub confidence_score: f32,
    pub impact_score: f32,
    pub effort_score: f32,
}
