//! Error types for the geofacet library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`GeofacetError`] enum. Location failures are recovered inside the
//! geolocation resolver and never reach callers; search failures are
//! surfaced through the renderer as a transient banner.
//!
//! # Examples
//!
//! ```
//! use geofacet::error::{GeofacetError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(GeofacetError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for geofacet operations.
#[derive(Error, Debug)]
pub enum GeofacetError {
    /// Neither the device nor the IP lookup produced a position.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// The search service errored, timed out or returned a malformed page.
    #[error("Search request failed: {0}")]
    SearchRequestFailed(String),

    /// A refinement named a facet that is not registered.
    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// I/O errors (config and dataset files, stdin)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with GeofacetError.
pub type Result<T> = std::result::Result<T, GeofacetError>;

impl GeofacetError {
    /// Create a new location unavailable error.
    pub fn location_unavailable<S: Into<String>>(msg: S) -> Self {
        GeofacetError::LocationUnavailable(msg.into())
    }

    /// Create a new search failure.
    pub fn search_failed<S: Into<String>>(msg: S) -> Self {
        GeofacetError::SearchRequestFailed(msg.into())
    }

    /// Create a new unknown facet error.
    pub fn unknown_facet<S: Into<String>>(facet_id: S) -> Self {
        GeofacetError::UnknownFacet(facet_id.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        GeofacetError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        GeofacetError::InvalidConfig(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        GeofacetError::OperationCancelled(msg.into())
    }

    /// Whether this error belongs to the search path.
    ///
    /// Transport and decoding failures only happen while talking to the
    /// search service, so they count as search failures as well.
    pub fn is_search_failure(&self) -> bool {
        matches!(
            self,
            GeofacetError::SearchRequestFailed(_)
                | GeofacetError::Http(_)
                | GeofacetError::Json(_)
        )
    }
}
