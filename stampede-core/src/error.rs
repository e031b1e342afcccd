use thiserror::Error;

/// Invalid scenario configuration. Fatal: rejected before any scenario starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("duplicate scenario name: {0}")]
    DuplicateName(String),

    #[error("scenario {0}: rate must be greater than zero")]
    ZeroRate(String),

    #[error("scenario {0}: time unit must be a positive duration")]
    ZeroTimeUnit(String),

    #[error("scenario {0}: rate is too high for the time unit (per-iteration period rounds to zero)")]
    RateTooHigh(String),

    #[error("scenario {0}: duration must be a positive duration")]
    ZeroDuration(String),

    #[error("scenario {0}: iteration count must be greater than zero")]
    ZeroIterations(String),

    #[error("scenario {0}: VU count must be greater than zero")]
    ZeroVus(String),
}

/// Failure reported by an iteration function.
///
/// The payload is a coarse classification (e.g. `"timeout"`, `"http-500"`)
/// used to bucket failures in the final report. Non-fatal: recorded and the
/// scenario keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct IterationError(pub String);

impl IterationError {
    pub fn new(class: impl Into<String>) -> Self {
        Self(class.into())
    }

    pub fn class(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IterationError {
    fn from(class: &str) -> Self {
        Self(class.to_string())
    }
}

impl From<String> for IterationError {
    fn from(class: String) -> Self {
        Self(class)
    }
}
