//! Download orchestration for one polling cycle
//!
//! A cycle fetches the front page, reconciles the [`ResourceStore`] against it, then
//! fetches and saves every eligible resource with bounded concurrency. Comment
//! threads are mined for further links on the way, which become eligible from the
//! next cycle on.
//!
//! Only a front-page failure aborts a cycle. Every other failure is absorbed into the
//! failing resource's status.

use crate::config::Config;
use crate::discovery::{self, FrontPageItem};
use crate::error::{Error, Result};
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::retry::IsRetryable;
use crate::storage::PageStorage;
use crate::store::ResourceStore;
use crate::types::{
    DownloadOutcome, Event, ItemId, ResourceId, ResourceKind, ResourceRecord, StoreSummary,
};
use crate::utils::validate_link;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// What happened during one cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entries found on the front page
    pub front_page_items: usize,
    /// Items dropped because they left the front page
    pub pruned: usize,
    /// Resources attempted this cycle
    pub attempted: usize,
    /// Resources saved this cycle
    pub saved: usize,
    /// Attempts that failed with a retryable error
    pub retryable_failures: usize,
    /// Attempts that failed permanently
    pub permanent_failures: usize,
    /// New resources found in comment threads
    pub discovered: usize,
    /// Store counters after the cycle
    pub summary: StoreSummary,
}

/// Per-resource result handed back to the cycle
struct ResourceResult {
    outcome: DownloadOutcome,
    discovered: usize,
}

/// Front-page archiver (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Crawler {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    store: ResourceStore,
    storage: PageStorage,
    event_tx: broadcast::Sender<Event>,
    files_saved: Arc<AtomicU64>,
}

impl Crawler {
    /// Create a crawler that fetches over HTTP
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a crawler with a custom page source
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            store: ResourceStore::new(config.download.retry_max),
            storage: PageStorage::new(config.download.destination_dir.clone()),
            config: Arc::new(config),
            fetcher,
            event_tx,
            files_saved: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Subscribe to crawler events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tracked resources
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Files written since the crawler was created
    pub fn files_saved(&self) -> u64 {
        self.files_saved.load(Ordering::Relaxed)
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Run one polling cycle to completion
    ///
    /// # Errors
    /// Returns [`Error::FrontPage`] if the front page cannot be fetched; nothing else
    /// aborts a cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        info!("Checking updates...");
        self.emit(Event::CycleStarted);

        let front_page_url = self.config.front_page_url();
        let home = ResourceId::new(ItemId::front_page(), ResourceKind::Home, 0);
        let page = match self.fetcher.fetch(&front_page_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(resource = %home, error = %e, "Front page fetch failed, skipping cycle");
                self.emit(Event::CycleAborted {
                    reason: e.to_string(),
                });
                return Err(Error::FrontPage(e));
            }
        };

        let items = discovery::discover_front_page(&page.text, &self.config.source)?;
        info!(count = items.len(), "Got articles in top");

        let mut report = CycleReport {
            front_page_items: items.len(),
            pruned: self.reconcile(&items).await,
            ..CycleReport::default()
        };

        let eligible = self.store.eligible_for_download().await;
        info!(count = eligible.len(), "Got resources to download at current cycle");
        report.attempted = eligible.len();

        let results: Vec<ResourceResult> = stream::iter(eligible)
            .map(|record| self.process_resource(record))
            .buffer_unordered(self.config.download.max_concurrent_fetches)
            .collect()
            .await;

        for result in results {
            report.discovered += result.discovered;
            match result.outcome {
                DownloadOutcome::Saved { .. } => report.saved += 1,
                DownloadOutcome::Retryable(_) => report.retryable_failures += 1,
                DownloadOutcome::Permanent(_) => report.permanent_failures += 1,
            }
        }

        report.summary = self.store.summary().await;
        self.emit(Event::CycleFinished {
            summary: report.summary,
        });
        Ok(report)
    }

    /// Prune items that left the front page and register the new ones
    ///
    /// Returns the number of items pruned.
    async fn reconcile(&self, items: &[FrontPageItem]) -> usize {
        let current: HashSet<ItemId> = items.iter().map(|item| item.item_id.clone()).collect();
        let pruned = self.store.prune_to(&current).await;
        if pruned > 0 {
            info!(count = pruned, "Cleared items which are not in top anymore");
            self.emit(Event::ItemsPruned { count: pruned });
        }

        for item in items {
            if self.store.contains_item(&item.item_id).await {
                continue;
            }

            if validate_link(&item.article_link) {
                self.store
                    .register_if_absent(
                        ResourceId::new(item.item_id.clone(), ResourceKind::Article, 0),
                        item.article_link.clone(),
                    )
                    .await;
            } else {
                debug!(
                    item_id = %item.item_id,
                    link = %item.article_link,
                    "Article link is not an HTML page, not tracking it"
                );
            }

            self.store
                .register_if_absent(
                    ResourceId::new(item.item_id.clone(), ResourceKind::Comment, 0),
                    item.comment_link.clone(),
                )
                .await;
        }

        pruned
    }

    /// Fetch, mine (comment threads only), save and record one resource
    async fn process_resource(&self, record: ResourceRecord) -> ResourceResult {
        let ResourceRecord { id, link, .. } = record;
        info!(resource = %id, url = %link, "Downloading");

        let mut discovered = 0;
        let outcome = match self.fetcher.fetch(&link).await {
            Err(e) if e.is_retryable() => DownloadOutcome::Retryable(e.to_string()),
            Err(e) => DownloadOutcome::Permanent(e.to_string()),
            Ok(page) => {
                if id.kind == ResourceKind::Comment {
                    discovered = self.discover_comment_links(&id.item_id, &page.text).await;
                }

                match self.storage.save(&id, &page.text, page.encoding).await {
                    Ok(path) => DownloadOutcome::Saved { path },
                    Err(e) if e.is_retryable() => DownloadOutcome::Retryable(e.to_string()),
                    Err(e) => DownloadOutcome::Permanent(e.to_string()),
                }
            }
        };

        let status = self
            .store
            .record_outcome(&id, &outcome)
            .await
            .map(|status| status.to_i32());

        match &outcome {
            DownloadOutcome::Saved { path } => {
                self.files_saved.fetch_add(1, Ordering::Relaxed);
                info!(resource = %id, path = %path.display(), "Saved page");
                self.emit(Event::ResourceSaved {
                    id,
                    path: path.clone(),
                });
            }
            DownloadOutcome::Retryable(reason) | DownloadOutcome::Permanent(reason) => {
                let permanent = matches!(outcome, DownloadOutcome::Permanent(_));
                warn!(resource = %id, error = %reason, permanent, ?status, "Download failed");
                self.emit(Event::ResourceFailed {
                    id,
                    reason: reason.clone(),
                    permanent,
                });
            }
        }

        ResourceResult {
            outcome,
            discovered,
        }
    }

    async fn discover_comment_links(&self, item_id: &ItemId, html: &str) -> usize {
        match discovery::discover_resources_in_comments(html, &self.config.source) {
            Ok(links) => {
                let found = links.len();
                let registered =
                    discovery::register_comment_resources(&self.store, item_id, links).await;
                debug!(item_id = %item_id, found, registered, "Mined comment thread for links");
                registered
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Failed to mine comment thread");
                0
            }
        }
    }

    /// Log the end-of-cycle report
    pub async fn log_summary(&self) {
        let summary = self.store.summary().await;
        info!(
            tracked_items = summary.tracked_items,
            total = summary.total,
            scheduled = summary.eligible,
            saved = summary.saved,
            permanently_failed = summary.permanently_failed,
            exhausted = summary.exhausted,
            files_saved_from_start = self.files_saved(),
            "Resources associated with current top"
        );
    }
}
