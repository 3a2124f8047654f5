//! Future-date cleanup and end-of-run statistics.

use chrono::NaiveDateTime;
use tracing::info;

use super::store::ArticleStore;
use super::types::StorageStats;
use crate::Result;

/// Delete articles published after `now`. Articles dated exactly `now` stay.
pub async fn purge_future<S: ArticleStore>(store: &S, now: NaiveDateTime) -> Result<u64> {
    let removed = store.delete_future(now).await?;
    if removed > 0 {
        info!("Removed {} articles dated in the future", removed);
    }
    Ok(removed)
}

/// Collect totals and per-feed statistics.
pub async fn collect_stats<S: ArticleStore>(store: &S, now: NaiveDateTime) -> Result<StorageStats> {
    let totals = store.article_totals().await?;
    let feeds = store.feed_stats().await?;

    Ok(StorageStats {
        total_articles: totals.total,
        oldest_published: totals.oldest,
        oldest_age_days: totals.oldest.map(|oldest| age_in_days(oldest, now)),
        approx_bytes: totals.approx_bytes,
        feeds,
    })
}

/// Whole days between `then` and `now`, rounded to nearest.
pub fn age_in_days(then: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let seconds = now.signed_duration_since(then).num_seconds() as f64;
    (seconds / 86_400.0).round() as i64
}

/// Human-readable size, e.g. `1.5 MB`.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes.max(0), UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
