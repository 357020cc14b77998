//! In-memory resource tracking
//!
//! The store maps each front-page item to the resources known for it and their
//! download status. All mutation goes through the async methods below, each of which
//! holds the store lock for its whole read-modify-write, so concurrent download
//! tasks never lose an update or register the same identity twice.

use crate::types::{
    DownloadOutcome, ItemId, ResourceId, ResourceRecord, ResourceStatus, StoreSummary,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Resources of one item, keyed by identity
type ItemResources = BTreeMap<ResourceId, ResourceRecord>;

/// Shared tracked-item set (cloneable - state is Arc-wrapped)
#[derive(Clone, Debug)]
pub struct ResourceStore {
    items: Arc<Mutex<BTreeMap<ItemId, ItemResources>>>,
    retry_max: u32,
}

impl ResourceStore {
    /// Create an empty store
    ///
    /// A resource stays eligible while it has failed at most `retry_max` times.
    pub fn new(retry_max: u32) -> Self {
        Self {
            items: Arc::new(Mutex::new(BTreeMap::new())),
            retry_max,
        }
    }

    /// Whether `item_id` is tracked
    pub async fn contains_item(&self, item_id: &ItemId) -> bool {
        self.items.lock().await.contains_key(item_id)
    }

    /// Insert a pending record unless the identity is already known
    ///
    /// Returns `true` if a record was inserted. Re-registering a known identity never
    /// touches its status or link.
    pub async fn register_if_absent(&self, id: ResourceId, link: String) -> bool {
        let mut items = self.items.lock().await;
        let resources = items.entry(id.item_id.clone()).or_default();
        if resources.contains_key(&id) {
            return false;
        }

        debug!(resource = %id, link = %link, "Registered resource");
        resources.insert(
            id.clone(),
            ResourceRecord {
                id,
                link,
                status: ResourceStatus::Pending,
            },
        );
        true
    }

    /// Drop every item not in `current`, with all of its resources
    ///
    /// Returns the number of items removed.
    pub async fn prune_to(&self, current: &HashSet<ItemId>) -> usize {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|item_id, _| current.contains(item_id));
        before - items.len()
    }

    /// Every record due for an attempt, ordered by identity
    pub async fn eligible_for_download(&self) -> Vec<ResourceRecord> {
        let items = self.items.lock().await;
        items
            .values()
            .flat_map(|resources| resources.values())
            .filter(|record| record.status.is_eligible(self.retry_max))
            .cloned()
            .collect()
    }

    /// Apply the outcome of an attempt to the record's status
    ///
    /// Returns the new status, or `None` if the record is no longer tracked.
    pub async fn record_outcome(
        &self,
        id: &ResourceId,
        outcome: &DownloadOutcome,
    ) -> Option<ResourceStatus> {
        let mut items = self.items.lock().await;
        let Some(record) = items
            .get_mut(&id.item_id)
            .and_then(|resources| resources.get_mut(id))
        else {
            debug!(resource = %id, "Outcome for untracked resource ignored");
            return None;
        };

        record.status = record.status.apply(outcome);
        Some(record.status)
    }

    /// Current record for `id`
    pub async fn get(&self, id: &ResourceId) -> Option<ResourceRecord> {
        let items = self.items.lock().await;
        items
            .get(&id.item_id)
            .and_then(|resources| resources.get(id))
            .cloned()
    }

    /// All records of one item, ordered by identity
    pub async fn resources_of(&self, item_id: &ItemId) -> Vec<ResourceRecord> {
        let items = self.items.lock().await;
        items
            .get(item_id)
            .map(|resources| resources.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Tracked item ids, ordered
    pub async fn item_ids(&self) -> Vec<ItemId> {
        self.items.lock().await.keys().cloned().collect()
    }

    /// Counters over everything tracked
    pub async fn summary(&self) -> StoreSummary {
        let items = self.items.lock().await;
        let mut summary = StoreSummary {
            tracked_items: items.len(),
            ..StoreSummary::default()
        };

        for record in items.values().flat_map(|resources| resources.values()) {
            summary.total += 1;
            match record.status {
                ResourceStatus::Saved => summary.saved += 1,
                ResourceStatus::Rejected => summary.permanently_failed += 1,
                status if status.is_eligible(self.retry_max) => summary.eligible += 1,
                _ => summary.exhausted += 1,
            }
        }
        summary
    }
}
