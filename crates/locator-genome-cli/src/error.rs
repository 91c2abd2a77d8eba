//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or report (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Genome library error
    #[error("{0}")]
    Genome(#[from] locator_genome::GenomeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_genome::GenomeError;

    #[test]
    fn test_config_error_message() {
        let err = CliError::config("missing file");
        assert_eq!(err.to_string(), "Configuration error: missing file");
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = CliError::invalid_argument("--limit must be positive");
        assert_eq!(err.to_string(), "Invalid argument: --limit must be positive");
    }

    #[test]
    fn test_genome_error_passes_message_through() {
        let err: CliError = GenomeError::unknown_element("abc123").into();
        assert_eq!(err.to_string(), "Unknown element: abc123");
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CliError = json_err.into();
        assert!(matches!(err, CliError::Json(_)));
    }
}
