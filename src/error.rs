//! Error taxonomy for the projection engine

use thiserror::Error;

use crate::records::AssetBucket;

/// Errors surfaced to callers of the engine
///
/// Incomplete records are never errors: they are skipped and the rest of the
/// projection proceeds. Only scenario configuration that cannot be resolved
/// to a single rate per year, or inputs that make the run meaningless, fail.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(
        "overlapping return overrides for {bucket}: [{first_from}, {first_to}] and [{second_from}, {second_to}]"
    )]
    MalformedOverrides {
        bucket: AssetBucket,
        first_from: i32,
        first_to: i32,
        second_from: i32,
        second_to: i32,
    },

    #[error("computation failed: {0}")]
    Computation(String),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidScenario(message.into())
    }

    /// True for caller-correctable validation failures
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::InvalidScenario(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
