//! Feed refresh and retention.
//!
//! This module fetches configured RSS/Atom feeds, stores their articles and
//! prunes them according to each feed's lifetime.

pub mod fetcher;
pub mod parser;
pub mod repository;
pub mod retention;
pub mod sanitizer;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod updater;

pub use fetcher::{validate_url, DocumentFetcher, HttpFetcher};
pub use parser::{parse_document, parse_feed};
pub use repository::ArticleRepository;
pub use retention::{plan_buckets, prune_expired, RetentionBucket, RetentionReport};
pub use sanitizer::{age_in_days, collect_stats, purge_future};
pub use scheduler::{evaluate, plan_refresh, Disposition, FeedDisposition};
pub use store::ArticleStore;
pub use types::{
    Article, ArticleTotals, CycleSummary, FeedDescriptor, FeedStats, FeedUpdateRecord,
    LifetimeSetting, NewArticle, RawArticle, StorageStats, UpsertReport, DEFAULT_REFRESH_MINUTES,
    MAX_FEED_SIZE, MAX_ITEMS_PER_FEED, UNTITLED,
};
pub use updater::{to_new_articles, NewsUpdater, UpdateOptions};
