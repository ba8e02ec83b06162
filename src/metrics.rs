// src/metrics.rs
//! Metric names and one-time registration against the `metrics` facade.
//! The binary decides which recorder to install; the library only describes
//! and emits.

use metrics::{describe_counter, describe_histogram, Unit};
use once_cell::sync::OnceCell;

pub const ARTICLES_PROCESSED: &str = "scout_articles_processed_total";
pub const ARTICLES_REJECTED: &str = "scout_articles_rejected_total";
pub const ARTICLES_AUGMENTED: &str = "scout_articles_augmented_total";
pub const AUGMENT_FAILURES: &str = "scout_augment_failures_total";
pub const ARTICLES_SKIPPED: &str = "scout_articles_skipped_total";
pub const RECOMMENDATIONS_EMITTED: &str = "scout_recommendations_emitted_total";
pub const PROCESSING_RETRIES: &str = "scout_processing_retries_total";
pub const PROCESSING_SECONDS: &str = "scout_processing_seconds";

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Describe all metrics exactly once, no matter how many pipelines start.
pub fn register() {
    REGISTERED.get_or_init(|| {
        describe_counter!(
            ARTICLES_PROCESSED,
            "Articles that completed processing, by outcome"
        );
        describe_counter!(
            ARTICLES_REJECTED,
            "Articles rejected by a hard prefilter gate, by reason"
        );
        describe_counter!(
            ARTICLES_AUGMENTED,
            "Articles sent to the augmentation collaborator"
        );
        describe_counter!(
            AUGMENT_FAILURES,
            "Augmentation calls that failed; processing continued without them"
        );
        describe_counter!(
            ARTICLES_SKIPPED,
            "Duplicate deliveries of already-processed articles"
        );
        describe_counter!(
            RECOMMENDATIONS_EMITTED,
            "Recommendations written after delete-then-insert"
        );
        describe_counter!(
            PROCESSING_RETRIES,
            "Worker retries after a retryable processing error"
        );
        describe_histogram!(
            PROCESSING_SECONDS,
            Unit::Seconds,
            "Wall time of one article processing run"
        );
    });
}
