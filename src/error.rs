//! Error types for the search engine.

use thiserror::Error;

/// Why a run gave up without a definite verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The cooperative interrupt flag was raised.
    Interrupted,
    /// The obligation budget was exhausted.
    Obligations,
    /// The level ceiling budget was exhausted.
    Levels,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Interrupted => write!(f, "interrupted"),
            Resource::Obligations => write!(f, "obligation budget"),
            Resource::Levels => write!(f, "level budget"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The oracle answered `unknown`; never coerced into a verdict.
    #[error("oracle returned unknown")]
    OracleUnknown,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(Resource),

    /// A soundness invariant was violated. Fatal; indicates a bug, not a
    /// property of the input.
    #[error("internal inconsistency: {0}")]
    Inconsistency(String),
}

pub type Result<T> = std::result::Result<T, Error>;
