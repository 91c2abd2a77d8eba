//! Result and error types for locator-genome.

use thiserror::Error;

/// Result type for genome operations
pub type GenomeResult<T> = Result<T, GenomeError>;

/// Errors that can occur while capturing, scoring or persisting element history
#[derive(Debug, Error)]
pub enum GenomeError {
    /// The element source reported no element for the selector
    #[error("Element not found for selector: {selector}")]
    ElementNotFound {
        /// Primary selector that resolved to nothing
        selector: String,
    },

    /// The element source did not answer in time
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The element source failed for a reason other than absence
    #[error("Element source error: {message}")]
    Source {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// No history exists for the tracking id
    #[error("Unknown element: {tracking_id}")]
    UnknownElement {
        /// Tracking id that was looked up
        tracking_id: String,
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

impl GenomeError {
    /// Create an element-not-found error
    #[must_use]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Create an element source error
    #[must_use]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown-element error
    #[must_use]
    pub fn unknown_element(tracking_id: impl Into<String>) -> Self {
        Self::UnknownElement {
            tracking_id: tracking_id.into(),
        }
    }

    /// Whether the caller may reasonably retry with another selector
    #[must_use]
    pub const fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. } | Self::Timeout { .. })
    }
}
