//! Error types for hn-dl
//!
//! This module provides the error taxonomy used throughout the crate:
//! - [`Error`], the crate-wide error returned by fallible operations
//! - [`FetchError`], the tagged outcome of a failed page fetch (retryable or permanent)
//! - [`SaveError`], a failure writing a downloaded page to disk

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hn-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hn-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.retry_max")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error raised while building or driving the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The front page could not be fetched; the whole cycle is abandoned
    #[error("front page unavailable: {0}")]
    FrontPage(FetchError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Why a page could not be fetched
///
/// Retryable failures (network trouble, transient server states) bump the
/// resource's retry counter. Permanent failures (forbidden, not found, wrong
/// content type, undecodable body) take the resource out of rotation for good.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transient failure, worth another attempt next cycle
    #[error("{url}: {reason}")]
    Retryable {
        /// URL that was requested
        url: String,
        /// Human-readable cause
        reason: String,
    },

    /// Definitive failure, never retried
    #[error("{url}: {reason}")]
    Permanent {
        /// URL that was requested
        url: String,
        /// Human-readable cause
        reason: String,
    },
}

impl FetchError {
    /// Build a retryable failure
    pub fn retryable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::Retryable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Build a permanent failure
    pub fn permanent(url: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::Permanent {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// The human-readable cause, without the URL
    pub fn reason(&self) -> &str {
        match self {
            FetchError::Retryable { reason, .. } | FetchError::Permanent { reason, .. } => reason,
        }
    }

    /// True for [`FetchError::Permanent`]
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::Permanent { .. })
    }
}

/// Failure writing a downloaded page to disk
#[derive(Debug, Error)]
pub enum SaveError {
    /// Creating the per-item directory failed
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Writing the file failed
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The text could not be represented in the requested encoding
    #[error("cannot encode {path} as {encoding}")]
    Unencodable {
        /// File that was about to be written
        path: PathBuf,
        /// Requested encoding label
        encoding: String,
    },
}
