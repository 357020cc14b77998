use clap::Parser;
use hn_dl::{Config, Crawler, Scheduler, logging, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Poll the front page and archive articles, comment threads and linked pages.
#[derive(Parser, Debug)]
#[command(name = "hn-dl")]
#[command(about = "Front-page archiver for news.ycombinator.com")]
#[command(version)]
struct Cli {
    /// Content check and update periodicity, seconds [default: 360]
    #[arg(long = "update_cycle", alias = "update-cycle")]
    update_cycle: Option<u64>,

    /// Directory pages are saved under
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Retryable failures tolerated per resource
    #[arg(long)]
    retry_max: Option<u32>,

    /// Maximum fetches in flight during a cycle
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn into_config(self) -> hn_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(update_cycle) = self.update_cycle {
            config.schedule.update_cycle = Duration::from_secs(update_cycle);
        }
        if let Some(destination) = self.destination {
            config.download.destination_dir = destination;
        }
        if let Some(retry_max) = self.retry_max {
            config.download.retry_max = retry_max;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.download.max_concurrent_fetches = max_concurrent;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.log_json) {
        eprintln!("failed to initialize logging: {e}");
    }

    let once = cli.once;
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let crawler = match Crawler::new(config) {
        Ok(crawler) => Arc::new(crawler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start crawler");
            return ExitCode::FAILURE;
        }
    };

    let scheduler = Scheduler::new(crawler);
    if once {
        scheduler.tick().await;
        return ExitCode::SUCCESS;
    }

    match run_with_shutdown(scheduler).await {
        Ok(cycles) => {
            tracing::info!(cycles, "Shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduler failed");
            ExitCode::FAILURE
        }
    }
}
