//! Error types for pta-engine
//!
//! Provides unified error handling across the crate.
//!
//! Only two conditions are errors at all (see the propagation policy in the
//! solver): invalid configuration detected before solving starts, and
//! internal invariant violations that would break the soundness/termination
//! argument. Unresolved dispatch and time-limit aborts are ordinary,
//! documented outcomes and never surface here.

use thiserror::Error;

/// Main error type for pta-engine operations
#[derive(Debug, Error)]
pub enum PtaError {
    /// Configuration error (invalid context descriptor, bad entry points).
    /// Raised at construction time, before any solving begins.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation (a points-to set observed to shrink, a
    /// broken canonical registry). Always a defect, never tolerated.
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl PtaError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PtaError::Config(msg.into())
    }

    /// Create an invariant-violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        PtaError::Invariant(msg.into())
    }
}

/// Result type alias for pta-engine operations
pub type Result<T> = std::result::Result<T, PtaError>;
