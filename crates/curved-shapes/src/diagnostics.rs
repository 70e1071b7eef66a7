//! Recoverable problems reported while building a feature.

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// An internal fallback was used; the result is still usable.
    Warning,
    /// Part of the requested result could not be built.
    Error,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of the problem.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

/// Ordered list of diagnostics collected during one operation.
///
/// Every entry is also emitted as a `tracing` event when it is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }

    /// All entries in the order they were recorded.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any entry has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// True if any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }

    /// Append all entries of `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_severity() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.warning("used loft");
        assert!(!diags.has_errors());

        diags.error("shape is not closed");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.entries()[0].severity, Severity::Warning);
        assert!(diags.contains("not closed"));
    }
}
