//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// The suite ran and at least one test failed
    #[error("{failed} of {total} tests failed")]
    TestsFailed {
        /// Failed or skipped tests
        failed: usize,
        /// Tests selected
        total: usize,
    },

    /// Feature not compiled in
    #[error("{feature} support is not compiled in; rebuild with --features {feature}")]
    FeatureDisabled {
        /// Cargo feature name
        feature: &'static str,
    },

    /// labprobe library error
    #[error("{0}")]
    Probe(#[from] labprobe::ProbeError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML rendering error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tests_failed() {
        let err = CliError::TestsFailed { failed: 1, total: 2 };
        assert_eq!(err.to_string(), "1 of 2 tests failed");
    }

    #[test]
    fn test_feature_disabled() {
        let err = CliError::FeatureDisabled { feature: "browser" };
        assert!(err.to_string().contains("--features browser"));
    }

    #[test]
    fn test_probe_error_from() {
        let err: CliError = labprobe::ProbeError::config("base_url must be http").into();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_probe_error_text_is_not_prefixed() {
        let err: CliError = labprobe::ProbeError::config("base_url must be http").into();
        assert_eq!(
            err.to_string(),
            labprobe::ProbeError::config("base_url must be http").to_string()
        );
    }
}
