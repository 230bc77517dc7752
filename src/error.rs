//! Error types shared by every workhorse component.
//!
//! The taxonomy is deliberately small. Configuration problems surface as
//! [`Error::InvalidArgument`] and are fatal at startup; everything else is
//! recoverable at runtime and is logged and skipped by the loop that hit it.

use thiserror::Error;

/// Primary error type for workhorse operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A configuration value or call argument violates its bounds.
    #[error("invalid argument: {detail}")]
    InvalidArgument {
        /// What was wrong, naming the offending field or parameter.
        detail: String,
    },

    /// A cache slot outside `[0, capacity)` was addressed.
    #[error("index {index} out of range for cache of capacity {capacity}")]
    OutOfRange {
        /// The requested slot.
        index: usize,
        /// The capacity of the cache that rejected it.
        capacity: usize,
    },

    /// The worker pool refused to admit more work.
    #[error("resource exhausted: {detail}")]
    ResourceExhausted {
        /// Why admission was refused.
        detail: String,
    },

    /// A suspension was cut short by shutdown.
    #[error("interrupted by shutdown")]
    Interrupted,
}

impl Error {
    /// Builds an [`Error::InvalidArgument`] from anything printable.
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            detail: detail.into(),
        }
    }

    /// Builds an [`Error::ResourceExhausted`] from anything printable.
    pub fn resource_exhausted(detail: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            detail: detail.into(),
        }
    }

    /// Whether a running loop may log this error and carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidArgument { .. })
    }

    /// Short, stable name of the error kind for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::OutOfRange { .. } => "out_of_range",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
