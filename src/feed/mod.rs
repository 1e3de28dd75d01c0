//! Feed collection: fetching RSS documents and turning them into posts.
//!
//! - [`client`] - HTTP retrieval with a timeout and a body size cap
//! - [`parser`] - RSS 2.0 channel parsing
//! - [`scraper`] - one scrape cycle against the stalest feed
//! - [`scheduler`] - the periodic, cancellable loop behind `agg`

pub mod client;
pub mod parser;
pub mod scheduler;
pub mod scraper;

pub use client::{FeedClient, FetchError};
pub use parser::{parse_feed, parse_pub_date, ParseError, RssChannel, RssFeed, RssItem};
pub use scheduler::{parse_interval, shutdown_on_signal, IntervalError, Scheduler};
pub use scraper::{ingest_items, scrape_feed, scrape_next, IngestStats, ScrapeReport};
