//! # hn-dl
//!
//! Front-page archiver. Polls a news listing, tracks every article, comment thread
//! and comment-linked page of the items currently on it, and saves each one to disk
//! exactly once.
//!
//! ## Design
//!
//! - **Exactly-once** - saved and permanently failed resources are never fetched again
//! - **Bounded retry** - transient failures are retried on later cycles, up to `retry_max`
//! - **Self-pruning** - items that drop off the front page are forgotten
//! - **Bounded fan-out** - at most `max_concurrent_fetches` requests in flight
//!
//! ## Quick Start
//!
//! ```no_run
//! use hn_dl::{Config, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.destination_dir = "archive".into();
//!
//!     let crawler = Crawler::new(config)?;
//!     let report = crawler.run_cycle().await?;
//!     println!("saved {} pages", report.saved);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Download orchestration
pub mod crawler;
/// Front page and comment thread parsing
pub mod discovery;
/// Error types
pub mod error;
/// Page fetching
pub mod fetcher;
/// Tracing subscriber setup
pub mod logging;
/// Retry classification
pub mod retry;
/// Periodic polling
pub mod scheduler;
/// Writing pages to disk
pub mod storage;
/// Resource tracking
pub mod store;
/// Core types and events
pub mod types;
/// URL helpers
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, CycleReport};
pub use error::{Error, FetchError, Result, SaveError};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use scheduler::Scheduler;
pub use store::ResourceStore;
pub use types::{
    DownloadOutcome, Event, ItemId, ResourceId, ResourceKind, ResourceRecord, ResourceStatus,
    StoreSummary,
};

/// Run the scheduler until a termination signal arrives.
///
/// Waits for a signal, then cancels the scheduler's shutdown token and waits for the
/// loop to wind down (a cycle in progress is finished first).
///
/// Listens for SIGTERM and SIGINT on Unix and for Ctrl+C elsewhere (or when the
/// Unix handlers cannot be registered).
///
/// # Example
///
/// ```no_run
/// use hn_dl::{Config, Crawler, Scheduler, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let crawler = Arc::new(Crawler::new(Config::default())?);
///     run_with_shutdown(Scheduler::new(crawler)).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(scheduler: Scheduler) -> Result<u64> {
    let shutdown = scheduler.shutdown_token();
    let handle = tokio::spawn(scheduler.run());

    wait_for_signal().await;
    shutdown.cancel();

    handle
        .await
        .map_err(|e| Error::Other(format!("scheduler task failed: {e}")))
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "Shutdown requested");
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Signal handlers unavailable, waiting for Ctrl+C");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "Ctrl+C", "Shutdown requested"),
        Err(e) => tracing::error!(error = %e, "Cannot listen for Ctrl+C, shutting down"),
    }
}
