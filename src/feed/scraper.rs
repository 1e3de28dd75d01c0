//! One scrape cycle: pick the stalest feed, mark it fetched, pull its
//! document and store each item as a post.
//!
//! Nothing in here returns an error. Failures are logged where they happen
//! and end either the item or the cycle, so the scheduler loop above never
//! sees them.

use super::client::FeedClient;
use super::parser::RssItem;
use crate::storage::{Database, Feed, NewPost};

/// Outcome of a single scrape cycle (informational only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeReport {
    /// There are no feeds to scrape yet
    NoFeeds,
    /// The next feed could not be selected
    SelectFailed,
    /// The selected feed could not be marked as fetched; nothing was fetched
    MarkFailed { feed_name: String },
    /// The HTTP request or RSS parse failed; no posts were created
    FetchFailed { feed_name: String },
    Scraped {
        feed_name: String,
        stats: IngestStats,
    },
}

/// Per-item tally for one ingested document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Items in the fetched document
    pub items: usize,
    pub inserted: usize,
    /// Items whose URL was already stored
    pub duplicates: usize,
    /// Items rejected for any other reason
    pub failed: usize,
}

/// Run one cycle against the feed with the oldest (or no) fetch timestamp.
pub async fn scrape_next(db: &Database, client: &FeedClient) -> ScrapeReport {
    let feed = match db.get_next_feed_to_fetch().await {
        Ok(Some(feed)) => feed,
        Ok(None) => {
            tracing::info!("No feeds to fetch yet, add one with `addfeed`");
            return ScrapeReport::NoFeeds;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Couldn't select next feed to fetch");
            return ScrapeReport::SelectFailed;
        }
    };
    tracing::debug!(feed = %feed.name, url = %feed.url, "Found a feed to fetch");

    scrape_feed(db, client, &feed).await
}

/// Scrape one feed.
///
/// The feed is marked fetched *before* the request goes out, so a feed that
/// keeps failing still moves to the back of the rotation.
pub async fn scrape_feed(db: &Database, client: &FeedClient, feed: &Feed) -> ScrapeReport {
    if let Err(e) = db.mark_feed_fetched(feed.id).await {
        tracing::warn!(feed = %feed.name, error = %e, "Couldn't mark feed as fetched");
        return ScrapeReport::MarkFailed {
            feed_name: feed.name.clone(),
        };
    }

    let document = match client.fetch(&feed.url).await {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Couldn't collect feed");
            return ScrapeReport::FetchFailed {
                feed_name: feed.name.clone(),
            };
        }
    };

    let stats = ingest_items(db, feed.id, &document.channel.items).await;
    tracing::info!(
        feed = %feed.name,
        items = stats.items,
        new = stats.inserted,
        duplicates = stats.duplicates,
        failed = stats.failed,
        "Feed {} collected, {} posts found",
        feed.name,
        stats.items
    );

    ScrapeReport::Scraped {
        feed_name: feed.name.clone(),
        stats,
    }
}

/// Insert `items` as posts of `feed_id`, in document order.
///
/// A URL that is already stored counts as a duplicate and is skipped
/// silently; any other insert failure is logged and skipped. An unparsable
/// `pubDate` stores the post without a publish time.
pub async fn ingest_items(db: &Database, feed_id: i64, items: &[RssItem]) -> IngestStats {
    let mut stats = IngestStats {
        items: items.len(),
        ..IngestStats::default()
    };

    for item in items {
        let url = item.link.trim();
        if url.is_empty() {
            tracing::warn!(title = %item.title, "Skipping item without a link");
            stats.failed += 1;
            continue;
        }

        let post = NewPost {
            feed_id,
            title: item.title.trim().to_string(),
            url: url.to_string(),
            description: Some(item.description.trim())
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            published_at: item.published_at(),
        };

        match db.create_post(&post).await {
            Ok(_) => stats.inserted += 1,
            Err(e) if e.is_duplicate_post() => stats.duplicates += 1,
            Err(e) => {
                tracing::warn!(url = %post.url, error = %e, "Couldn't create post");
                stats.failed += 1;
            }
        }
    }

    stats
}
