//! Link discovery on the front page and in comment threads
//!
//! The front page yields one [`FrontPageItem`] per listing entry. A downloaded comment
//! thread yields the links posted in its comments, which are registered as
//! [`ResourceKind::Resource`] entries under the thread's item.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::store::ResourceStore;
use crate::types::{ItemId, ResourceId, ResourceKind};
use crate::utils::normalize_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Listing entries on the front page
const ITEM_SELECTOR: &str = ".athing";
/// Title anchor within a listing entry
const TITLE_LINK_SELECTOR: &str = ".titleline a";
/// Comment bodies within a comment thread
const COMMENT_TEXT_SELECTOR: &str = ".commtext";
/// Anchors within a comment body
const ANCHOR_SELECTOR: &str = "a";

/// One entry of the front page listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontPageItem {
    /// Stable id of the entry
    pub item_id: ItemId,
    /// Normalized link of the displayed title
    pub article_link: String,
    /// Normalized link of the entry's comment thread
    pub comment_link: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Other(format!("invalid selector '{css}': {e}")))
}

/// Item ids name a directory under the destination root, so only plain
/// alphanumeric ids (plus `-` and `_`) are accepted
fn is_valid_item_id(id: &str) -> bool {
    id.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Comment thread link for an item, built from the configured path template
pub fn comment_link(source: &SourceConfig, item_id: &ItemId) -> String {
    normalize_url(
        &format!("{}?id={}", source.comment_path, item_id),
        &source.scheme,
        &source.host,
    )
}

/// Parse the front page into listing entries, in page order
///
/// Entries without a well-formed id or without a title link are skipped.
pub fn discover_front_page(html: &str, source: &SourceConfig) -> Result<Vec<FrontPageItem>> {
    let item_selector = selector(ITEM_SELECTOR)?;
    let title_selector = selector(TITLE_LINK_SELECTOR)?;
    let document = Html::parse_document(html);

    let mut items = Vec::new();
    for entry in document.select(&item_selector) {
        let Some(id) = entry.value().id().filter(|id| !id.is_empty()) else {
            debug!("Skipping listing entry without id");
            continue;
        };
        if !is_valid_item_id(id) {
            debug!(id = %id, "Skipping listing entry with malformed id");
            continue;
        }
        let item_id = ItemId::from(id);

        let Some(href) = entry
            .select(&title_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
        else {
            debug!(item_id = %item_id, "Skipping listing entry without title link");
            continue;
        };

        items.push(FrontPageItem {
            article_link: normalize_url(href, &source.scheme, &source.host),
            comment_link: comment_link(source, &item_id),
            item_id,
        });
    }

    Ok(items)
}

/// Collect the links posted in a comment thread
///
/// Hrefs are deduplicated by exact string before normalization and returned in
/// order of first appearance; a link's index is its sequence number.
pub fn discover_resources_in_comments(html: &str, source: &SourceConfig) -> Result<Vec<String>> {
    let comment_selector = selector(COMMENT_TEXT_SELECTOR)?;
    let anchor_selector = selector(ANCHOR_SELECTOR)?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for comment in document.select(&comment_selector) {
        for anchor in comment.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if seen.insert(href) {
                links.push(normalize_url(href, &source.scheme, &source.host));
            }
        }
    }

    Ok(links)
}

/// Register links found in `item_id`'s comment thread as resources
///
/// Returns how many identities were new.
pub async fn register_comment_resources(
    store: &ResourceStore,
    item_id: &ItemId,
    links: Vec<String>,
) -> usize {
    let mut registered = 0;
    for (seq, link) in (0u32..).zip(links) {
        let id = ResourceId::new(item_id.clone(), ResourceKind::Resource, seq);
        if store.register_if_absent(id, link).await {
            registered += 1;
        }
    }
    registered
}
