//! Error types for curved features.

use curved_kernel::KernelError;
use thiserror::Error;

/// Errors returned by the curved-shapes operations.
///
/// Geometric degeneracies that have a fallback are not errors: they are
/// recorded as [`Diagnostic`](crate::Diagnostic)s and processing continues.
#[derive(Debug, Error)]
pub enum CurvedError {
    /// Missing or inconsistent input, detected before any geometry is built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A kernel operation failed where no fallback exists.
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Every construction path failed; there is no shape to return.
    #[error("nothing was built: {0}")]
    NothingBuilt(String),

    /// Settings or options could not be read or written.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl CurvedError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type for curved-shapes operations.
pub type Result<T> = std::result::Result<T, CurvedError>;
