//! Error types for wpcom-backup
//!
//! Errors fall into four families that the backup run treats differently:
//! - configuration problems, reported before any network activity
//! - API and network failures, fatal only for reference data or a first page
//! - per-post failures, logged and skipped by the orchestrator
//! - local I/O and serialization failures

use thiserror::Error;

/// Result type alias for wpcom-backup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wpcom-backup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The environment variable that caused the error (e.g., "WP_SITE_URL")
        key: Option<String>,
    },

    /// The API answered with a non-success HTTP status
    #[error("API error: {endpoint} page {page} returned HTTP {status}")]
    Api {
        /// Resource endpoint (e.g., "posts")
        endpoint: String,
        /// Page number requested
        page: u32,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// A media file could not be downloaded
    #[error("download of {url} failed with HTTP {status}")]
    Download {
        /// URL of the file
        url: String,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// Network error (connection, timeout, body decoding)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Front matter serialization error
    #[error("front matter error: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    /// A post record could not be turned into an archive entry
    #[error("invalid post {id}: {reason}")]
    InvalidPost {
        /// Post ID, or "unknown" when the record has none
        id: String,
        /// Why the post was rejected
        reason: String,
    },

    /// The run was stopped by a termination signal
    #[error("backup interrupted")]
    Interrupted,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for a specific setting
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Build an invalid-post error
    pub fn invalid_post(id: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidPost {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for configuration errors
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// Returns true if the server answered with a 4xx status
    ///
    /// WordPress answers an out-of-range `page` with `400 Bad Request`, which the
    /// paginated fetcher reads as end-of-data when the probe agrees.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Api { status, .. } | Error::Download { status, .. } => {
                (400..500).contains(status)
            }
            Error::Network(e) => e.status().is_some_and(|s| s.is_client_error()),
            _ => false,
        }
    }

    /// Returns true for failures talking to the remote API
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Error::Api { .. } | Error::Download { .. } | Error::Network(_)
        )
    }

    /// Process exit code for a run that ended with this error
    ///
    /// Configuration problems exit with 2, an interrupted run with 130,
    /// everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config { .. } => 2,
            Error::Interrupted => 130,
            _ => 1,
        }
    }
}
