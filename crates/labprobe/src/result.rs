//! Result and error types for labprobe.

use thiserror::Error;

/// Result type for labprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Coarse classification of a failure, used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An element or readiness signal never showed up in time
    Timeout,
    /// A query matched zero or several elements where one was required
    Cardinality,
    /// Text, visibility or assertion count did not match
    Mismatch,
    /// Browser, page, I/O or configuration trouble
    Infrastructure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Cardinality => "cardinality",
            Self::Mismatch => "mismatch",
            Self::Infrastructure => "infrastructure",
        };
        f.write_str(s)
    }
}

/// Errors that can occur in labprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Query resolved but nothing acceptable matched
    #[error("No element matches {selector}")]
    NoMatch {
        /// Selector description
        selector: String,
    },

    /// Query matched more than the single element required
    #[error("Expected exactly one element for {selector}, found {count}")]
    MultipleMatches {
        /// Selector description
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A test made a different number of assertions than it declared
    #[error("Expected {expected} assertions to be called but received {actual}")]
    AssertionCount {
        /// Declared assertions
        expected: usize,
        /// Assertions actually made
        actual: usize,
    },

    /// JavaScript evaluation error
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid configuration or suite definition
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NoMatch { .. } | Self::MultipleMatches { .. } => FailureKind::Cardinality,
            Self::AssertionFailed { .. } | Self::AssertionCount { .. } => FailureKind::Mismatch,
            _ => FailureKind::Infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ProbeError::Timeout {
            what: ".jl-dr-browser".to_string(),
            ms: 15_000,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 15000ms waiting for .jl-dr-browser"
        );
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_cardinality_kinds() {
        let none = ProbeError::NoMatch {
            selector: "//h2".to_string(),
        };
        let many = ProbeError::MultipleMatches {
            selector: "//h2".to_string(),
            count: 3,
        };
        assert_eq!(none.kind(), FailureKind::Cardinality);
        assert_eq!(many.kind(), FailureKind::Cardinality);
        assert!(many.to_string().contains("found 3"));
    }

    #[test]
    fn test_assertion_count_message() {
        let err = ProbeError::AssertionCount {
            expected: 2,
            actual: 1,
        };
        assert!(err.to_string().contains("Expected 2 assertions"));
        assert_eq!(err.kind(), FailureKind::Mismatch);
    }

    #[test]
    fn test_io_is_infrastructure() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProbeError = io.into();
        assert_eq!(err.kind(), FailureKind::Infrastructure);
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Cardinality.to_string(), "cardinality");
    }
}
