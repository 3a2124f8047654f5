//! News types for newsfeed.

use chrono::NaiveDateTime;

/// Refresh interval in minutes when a feed does not configure one.
pub const DEFAULT_REFRESH_MINUTES: i64 = 30;

/// Maximum number of items taken from one feed document.
pub const MAX_ITEMS_PER_FEED: usize = 32;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Title stored for articles that have none.
pub const UNTITLED: &str = "No Title";

/// Configured retention for a feed.
#[derive(Debug, Clone, PartialEq)]
pub enum LifetimeSetting {
    /// No lifetime configured: keep forever.
    Unset,
    /// Lifetime in days. Non-positive values keep forever.
    Days(f64),
    /// A value that is not a number, kept verbatim for diagnostics.
    Invalid(String),
}

/// A configured feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDescriptor {
    /// Unique feed identifier.
    pub id: String,
    /// Fetch endpoint.
    pub url: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Refresh interval in minutes.
    pub refresh_minutes: i64,
    /// Retention horizon.
    pub lifetime: LifetimeSetting,
}

impl FeedDescriptor {
    /// Create a descriptor with the default refresh interval and no lifetime.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: None,
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
            lifetime: LifetimeSetting::Unset,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the refresh interval in minutes.
    pub fn with_refresh(mut self, minutes: i64) -> Self {
        self.refresh_minutes = minutes;
        self
    }

    /// Set the lifetime in days.
    pub fn with_lifetime_days(mut self, days: f64) -> Self {
        self.lifetime = LifetimeSetting::Days(days);
        self
    }

    /// Set the lifetime.
    pub fn with_lifetime(mut self, lifetime: LifetimeSetting) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Name for log lines: the display name if present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// An item as extracted from a feed document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub title: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
}

/// An article ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    /// Source URL, unique within its feed.
    pub url: String,
    /// Title.
    pub title: String,
    /// Normalized publish time.
    pub published_at: NaiveDateTime,
    /// Whether `published_at` came from the feed rather than the fetch time.
    pub date_from_source: bool,
    /// When the article was fetched.
    pub fetched_at: NaiveDateTime,
}

/// A stored article.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub feed_id: String,
    pub url: String,
    pub title: String,
    pub published_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// Per-feed bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdateRecord {
    pub feed_id: String,
    /// Most recent fetch attempt that counted as an update.
    pub last_updated: NaiveDateTime,
    /// Most recent fetch attempt.
    pub last_check: NaiveDateTime,
    /// Number of recorded attempts.
    pub update_count: i64,
}

/// Outcome of one upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Rows newly inserted.
    pub inserted: usize,
    /// Existing rows refreshed in place.
    pub updated: usize,
    /// Articles skipped because their statement failed.
    pub failed: usize,
}

/// Aggregate article counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleTotals {
    pub total: i64,
    pub oldest: Option<NaiveDateTime>,
    /// Sum of stored text lengths.
    pub approx_bytes: i64,
}

/// Statistics for one stored feed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStats {
    pub feed_id: String,
    pub article_count: i64,
    pub newest: Option<NaiveDateTime>,
    pub oldest: Option<NaiveDateTime>,
}

/// End-of-run storage report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub total_articles: i64,
    pub oldest_published: Option<NaiveDateTime>,
    /// Age of the oldest article in whole days, rounded to nearest.
    pub oldest_age_days: Option<i64>,
    pub approx_bytes: i64,
    pub feeds: Vec<FeedStats>,
}

/// Result of one update cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Feeds considered by the scheduler.
    pub feeds_checked: usize,
    /// Feeds that were due and fetched.
    pub feeds_refreshed: usize,
    /// Articles parsed from fetched documents.
    pub articles_fetched: usize,
    /// Articles newly stored.
    pub articles_added: usize,
    /// Stored articles refreshed in place.
    pub articles_updated: usize,
    /// Articles removed by retention.
    pub articles_expired: u64,
    /// Future-dated articles removed.
    pub future_removed: u64,
    /// Recoverable faults logged during the cycle.
    pub failures: usize,
    /// Final storage statistics, if they could be collected.
    pub stats: Option<StorageStats>,
}

impl CycleSummary {
    /// Total articles deleted this cycle.
    pub fn articles_removed(&self) -> u64 {
        self.articles_expired + self.future_removed
    }
}
