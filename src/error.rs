// src/error.rs
//! Processing error taxonomy. The split that matters operationally is
//! retryable vs permanent: the worker retries the former with backoff and
//! records the latter on the article immediately.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The augmentation collaborator could not be reached or answered badly.
    #[error("augmentation unavailable: {0}")]
    AugmentationUnavailable(String),

    #[error("processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage failure: {0}")]
    Storage(String),

    /// Anything a retry cannot fix.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ProcessError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProcessError::Permanent(_))
    }
}
