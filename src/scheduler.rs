//! Periodic polling
//!
//! This module runs polling cycles back to back with a fixed pause in between. Cycles
//! never overlap: the next one is scheduled only after the previous one finished.
//!
//! # Example
//!
//! ```no_run
//! use hn_dl::{Config, Crawler};
//! use hn_dl::scheduler::Scheduler;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let crawler = Arc::new(Crawler::new(Config::default())?);
//! let scheduler = Scheduler::new(crawler);
//! let shutdown = scheduler.shutdown_token();
//!
//! let handle = tokio::spawn(scheduler.run());
//! // ... later
//! shutdown.cancel();
//! handle.await?;
//! # Ok(())
//! # }
//! ```

use crate::Crawler;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs a polling cycle every `update_cycle`
pub struct Scheduler {
    /// Crawler driven by this scheduler
    crawler: Arc<Crawler>,

    /// Pause between the end of one cycle and the start of the next
    interval: Duration,

    /// Cancelled to stop the loop between cycles
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler using the crawler's configured update cycle
    pub fn new(crawler: Arc<Crawler>) -> Self {
        let interval = crawler.config().schedule.update_cycle;
        Self {
            crawler,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Override the pause between cycles
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Token that stops the scheduler when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one cycle and log its result
    ///
    /// A front-page failure is logged and swallowed; the next tick tries again.
    pub async fn tick(&self) {
        if let Err(e) = self.crawler.run_cycle().await {
            error!(error = %e, "Polling cycle failed");
        }
        self.crawler.log_summary().await;
    }

    /// Poll until the shutdown token is cancelled
    ///
    /// A cycle in progress always runs to completion; cancellation is observed while
    /// sleeping between cycles. Returns the number of cycles run.
    pub async fn run(self) -> u64 {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        let mut cycles = 0;

        while !self.shutdown.is_cancelled() {
            self.tick().await;
            cycles += 1;

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
