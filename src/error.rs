//! Error types for search compilation, planning and normalization

use std::time::Duration;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while compiling, executing or normalizing a search
#[derive(Error, Debug)]
pub enum SearchError {
    /// A filter value cannot be parsed as its parameter's declared type
    #[error("Invalid value: {0}")]
    Value(String),

    /// Spatial filter is not valid WKT or not one of the supported shapes
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    /// Requested facet paging window exceeds the safety ceiling
    #[error("Facets paging is only supported up to {ceiling} elements")]
    FacetTooLarge { ceiling: usize },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend answered with something the parser cannot read
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Backend execution failed
    #[error("Search execution failed: {0}")]
    Execution(String),

    /// Backend call did not complete within the caller-supplied timeout
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
}

impl SearchError {
    /// Create a new value error.
    pub fn value<S: Into<String>>(msg: S) -> Self {
        SearchError::Value(msg.into())
    }

    /// Create a new unsupported shape error.
    pub fn shape<S: Into<String>>(msg: S) -> Self {
        SearchError::UnsupportedShape(msg.into())
    }

    /// Create a new invalid response error.
    pub fn response<S: Into<String>>(msg: S) -> Self {
        SearchError::InvalidResponse(msg.into())
    }

    /// Whether the failure was caused by the caller's input (4xx-class).
    ///
    /// None of the errors are retryable; client errors additionally mean the
    /// request itself must change before it can succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::Value(_)
                | SearchError::UnsupportedShape(_)
                | SearchError::FacetTooLarge { .. }
        )
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SearchError::Value(_) => "INVALID_VALUE",
            SearchError::UnsupportedShape(_) => "UNSUPPORTED_SHAPE",
            SearchError::FacetTooLarge { .. } => "FACET_TOO_LARGE",
            SearchError::Configuration(_) => "CONFIGURATION_ERROR",
            SearchError::Serialization(_) => "SERIALIZATION_ERROR",
            SearchError::InvalidResponse(_) => "INVALID_RESPONSE",
            SearchError::Execution(_) => "EXECUTION_ERROR",
            SearchError::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}
