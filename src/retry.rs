//! Retry classification
//!
//! Resources are not retried in place. A retryable failure increments the
//! resource's counter and the next cycle picks it up again; a permanent failure
//! marks it dead. This module decides which errors fall on which side.
//!
//! # Example
//!
//! ```
//! use hn_dl::error::FetchError;
//! use hn_dl::retry::IsRetryable;
//!
//! let err = FetchError::retryable("https://example.com/", "connection reset");
//! assert!(err.is_retryable());
//! ```

use crate::error::{FetchError, SaveError};

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, server busy, connection reset, local disk
/// hiccups) should return `true`. Permanent failures (forbidden, not found, wrong
/// content type, undecodable body) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Retryable { .. })
    }
}

/// Save failures are retried: the page itself is presumed fine, only local storage
/// is suspect.
impl IsRetryable for SaveError {
    fn is_retryable(&self) -> bool {
        match self {
            SaveError::CreateDir { .. }
            | SaveError::Write { .. }
            | SaveError::Unencodable { .. } => true,
        }
    }
}
