#![warn(missing_docs)]

//! Loft operation for the curved-shapes kernel.
//!
//! Connects an ordered list of wires with ruled faces, one face per edge
//! index per pair of neighbouring wires.

mod loft;

pub use loft::{loft, LoftOptions};

use thiserror::Error;

/// Errors from the loft operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoftError {
    /// Fewer than two wires were given.
    #[error("loft needs at least 2 profiles, got {0}")]
    TooFewProfiles(usize),

    /// Wires have different edge counts.
    #[error("profile edge counts differ: {0} vs {1}")]
    MismatchedSegmentCounts(usize, usize),

    /// A wire cannot be used as a profile.
    #[error("profile {0} is invalid: {1}")]
    InvalidProfile(usize, String),
}
