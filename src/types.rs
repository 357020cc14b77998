//! Core types for hn-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of a front-page item (the listing's stable id, e.g. `"42"`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Sentinel id used for the front page itself
    pub const FRONT_PAGE: &'static str = "-1";

    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The front page sentinel
    pub fn front_page() -> Self {
        Self(Self::FRONT_PAGE.to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a resource is relative to its item
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// The front page listing
    Home,
    /// The submitted article the item links to
    Article,
    /// The item's comment thread
    Comment,
    /// A page linked from inside the comment thread
    Resource,
}

impl ResourceKind {
    /// Name used in logs and in saved file names
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Home => "home",
            ResourceKind::Article => "article",
            ResourceKind::Comment => "comment",
            ResourceKind::Resource => "resource",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique, immutable key of one fetchable unit
///
/// `seq` tells apart several resources of the same kind under one item. Articles and
/// comment threads always use `0`; resources found in a comment thread are numbered
/// in discovery order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Owning front-page item
    pub item_id: ItemId,
    /// Resource kind
    pub kind: ResourceKind,
    /// Sequence number within `(item_id, kind)`
    pub seq: u32,
}

impl ResourceId {
    /// Create a new ResourceId
    pub fn new(item_id: impl Into<ItemId>, kind: ResourceKind, seq: u32) -> Self {
        Self {
            item_id: item_id.into(),
            kind,
            seq,
        }
    }

    /// File name this resource is saved under, e.g. `comment0.html`
    pub fn file_name(&self) -> String {
        format!("{}{}.html", self.kind, self.seq)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}{}", self.item_id, self.kind, self.seq)
    }
}

/// Download status of a resource
///
/// Stored as an integer code: `0` pending, `n > 0` failed `n` times with a
/// retryable error, `-1` saved, `-2` rejected for good.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum ResourceStatus {
    /// Not attempted yet
    #[default]
    Pending,
    /// Attempted and failed with a retryable error `attempts` times
    Failed {
        /// Number of retryable failures so far
        attempts: u32,
    },
    /// Downloaded and saved
    Saved,
    /// Failed for a non-retryable reason
    Rejected,
}

impl ResourceStatus {
    /// Convert ResourceStatus to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ResourceStatus::Pending => 0,
            ResourceStatus::Failed { attempts } => i32::try_from(*attempts).unwrap_or(i32::MAX),
            ResourceStatus::Saved => -1,
            ResourceStatus::Rejected => -2,
        }
    }

    /// Saved and rejected resources are never attempted again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Saved | ResourceStatus::Rejected)
    }

    /// Due for a download attempt: pending, or failed no more than `retry_max` times
    pub fn is_eligible(&self, retry_max: u32) -> bool {
        match self {
            ResourceStatus::Pending => true,
            ResourceStatus::Failed { attempts } => *attempts <= retry_max,
            ResourceStatus::Saved | ResourceStatus::Rejected => false,
        }
    }

    /// Status after an attempt finished with `outcome`
    ///
    /// Terminal states are sticky. Retryable failures increment without a cap; once
    /// the count passes `retry_max` the resource simply stops being eligible.
    pub fn apply(self, outcome: &DownloadOutcome) -> Self {
        if self.is_terminal() {
            return self;
        }
        match outcome {
            DownloadOutcome::Saved { .. } => ResourceStatus::Saved,
            DownloadOutcome::Permanent(_) => ResourceStatus::Rejected,
            DownloadOutcome::Retryable(_) => {
                let attempts = match self {
                    ResourceStatus::Failed { attempts } => attempts.saturating_add(1),
                    _ => 1,
                };
                ResourceStatus::Failed { attempts }
            }
        }
    }
}

/// A tracked resource: identity, link to fetch and current status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource identity
    pub id: ResourceId,
    /// Normalized absolute URL
    pub link: String,
    /// Download status
    pub status: ResourceStatus,
}

/// Result of one fetch-and-save attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched and written to `path`
    Saved {
        /// File the page was written to
        path: PathBuf,
    },
    /// Transient failure; the resource will be retried
    Retryable(String),
    /// Definitive failure; the resource is dropped from rotation
    Permanent(String),
}

/// Counters over the resource store, reported at the end of every cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
    /// Front-page items currently tracked
    pub tracked_items: usize,
    /// Resources associated with the current top
    pub total: usize,
    /// Resources scheduled for download
    pub eligible: usize,
    /// Resources saved to disk
    pub saved: usize,
    /// Resources rejected for a non-retryable reason
    pub permanently_failed: usize,
    /// Resources whose retry budget is used up
    pub exhausted: usize,
}

/// Events emitted by the crawler
///
/// Consumers subscribe via [`crate::Crawler::subscribe`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A polling cycle started
    CycleStarted,

    /// Items that left the front page were dropped
    ItemsPruned {
        /// Number of items removed
        count: usize,
    },

    /// A resource was downloaded and written to disk
    ResourceSaved {
        /// Resource identity
        id: ResourceId,
        /// File written
        path: PathBuf,
    },

    /// A resource download attempt failed
    ResourceFailed {
        /// Resource identity
        id: ResourceId,
        /// Human-readable cause
        reason: String,
        /// Whether the resource is now out of rotation
        permanent: bool,
    },

    /// A cycle finished processing every eligible resource
    CycleFinished {
        /// Store counters after the cycle
        summary: StoreSummary,
    },

    /// A cycle was abandoned because the front page could not be fetched
    CycleAborted {
        /// Human-readable cause
        reason: String,
    },
}
