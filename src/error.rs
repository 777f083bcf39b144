//! Error types for configuration and control.

use thiserror::Error;

/// Errors raised when building, reconfiguring or controlling an analyzer.
///
/// Nothing on the tick path returns an error: once a configuration has been
/// accepted every tick is infallible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// A parameter set that cannot be run safely against the ring buffer.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Sampling period that is zero, negative or not finite.
    #[error("invalid sampling period: {0} ms")]
    InvalidPeriod(f64),

    /// The control queue towards the tick thread is full.
    #[error("control queue full, message dropped")]
    ControlQueueFull,
}

impl AnalyzerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AnalyzerError::InvalidConfiguration(reason.into())
    }
}
