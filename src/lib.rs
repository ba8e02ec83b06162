// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod augment;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod recommend;
pub mod relevance;
pub mod store;
pub mod types;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::config::{ConfigHandle, ConfigSnapshot};
pub use crate::error::ProcessError;
pub use crate::pipeline::{Pipeline, ProcessSummary};
pub use crate::store::{Datastore, MemoryStore};
pub use crate::types::{Article, Business, FeatureRecord, Recommendation};
pub use crate::worker::{Worker, WorkerConfig};
