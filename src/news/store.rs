//! Article store contract.

use std::future::Future;

use chrono::NaiveDateTime;

use super::types::{ArticleTotals, FeedStats, NewArticle, UpsertReport};
use crate::Result;

/// Persistence used by the update cycle.
///
/// Implementations own both the article rows and the per-feed bookkeeping;
/// nothing else touches storage directly.
pub trait ArticleStore {
    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Insert articles, refreshing existing `(feed_id, url)` rows in place.
    ///
    /// A failing article is logged and counted in `failed`; the rest of the
    /// batch still runs.
    fn upsert_articles(
        &self,
        feed_id: &str,
        articles: &[NewArticle],
    ) -> impl Future<Output = Result<UpsertReport>> + Send;

    /// Record a fetch attempt for `feed_id` at `when`.
    fn record_feed_attempt(
        &self,
        feed_id: &str,
        when: NaiveDateTime,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Most recent recorded attempt for `feed_id`.
    fn get_last_updated(
        &self,
        feed_id: &str,
    ) -> impl Future<Output = Result<Option<NaiveDateTime>>> + Send;

    /// Delete articles of the given feeds published before `cutoff`.
    fn delete_expired(
        &self,
        feed_ids: &[String],
        cutoff: NaiveDateTime,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Delete articles published after `now`.
    fn delete_future(&self, now: NaiveDateTime) -> impl Future<Output = Result<u64>> + Send;

    fn article_totals(&self) -> impl Future<Output = Result<ArticleTotals>> + Send;

    fn feed_stats(&self) -> impl Future<Output = Result<Vec<FeedStats>>> + Send;
}
