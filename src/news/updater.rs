//! Update cycle for newsfeed.
//!
//! One cycle: schedule, then fetch and store each due feed in configuration
//! order, then prune expired articles, remove future-dated ones and collect
//! statistics. Only an unreachable store fails the cycle.

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use super::fetcher::DocumentFetcher;
use super::parser::parse_document;
use super::retention::prune_expired;
use super::sanitizer::{collect_stats, format_bytes, purge_future};
use super::scheduler::{plan_refresh, Disposition};
use super::store::ArticleStore;
use super::types::{
    CycleSummary, FeedDescriptor, NewArticle, RawArticle, MAX_ITEMS_PER_FEED, UNTITLED,
};
use crate::clock::Clock;
use crate::datetime::parse_feed_date;
use crate::{NewsError, Result};

/// Options for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Maximum items taken from one feed document.
    pub max_items_per_feed: usize,
    /// Refresh every feed regardless of its interval.
    pub force: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            max_items_per_feed: MAX_ITEMS_PER_FEED,
            force: false,
        }
    }
}

/// Feed refresh and retention engine.
pub struct NewsUpdater<S, F, C> {
    store: S,
    fetcher: F,
    clock: C,
    options: UpdateOptions,
}

impl<S, F, C> NewsUpdater<S, F, C>
where
    S: ArticleStore,
    F: DocumentFetcher,
    C: Clock,
{
    /// Create a new updater with default options.
    pub fn new(store: S, fetcher: F, clock: C) -> Self {
        Self {
            store,
            fetcher,
            clock,
            options: UpdateOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one update cycle over `feeds`.
    ///
    /// Returns [`NewsError::DatabaseConnection`] if the store is unreachable;
    /// every other fault is logged and counted in [`CycleSummary::failures`].
    pub async fn run_cycle(&self, feeds: &[FeedDescriptor]) -> Result<CycleSummary> {
        if let Err(e) = self.store.ping().await {
            error!("Article store unavailable: {}", e);
            return Err(match e {
                NewsError::DatabaseConnection(_) => e,
                other => NewsError::DatabaseConnection(other.to_string()),
            });
        }

        let mut summary = CycleSummary {
            feeds_checked: feeds.len(),
            ..Default::default()
        };

        // Every feed refreshed this cycle is stamped with the cycle start.
        let started = self.clock.now();
        let plan = plan_refresh(&self.store, feeds, started, self.options.force).await;
        summary.failures += plan
            .iter()
            .filter(|p| p.disposition == Disposition::Unknown)
            .count();

        let due: Vec<&FeedDescriptor> = feeds
            .iter()
            .zip(&plan)
            .filter(|(_, disposition)| disposition.is_due())
            .map(|(feed, _)| feed)
            .collect();

        if due.is_empty() {
            info!("No feeds due for update ({} configured)", feeds.len());
        } else {
            info!("Updating {} of {} feed(s)", due.len(), feeds.len());
        }

        for feed in due {
            self.refresh_feed(feed, started, &mut summary).await;
        }

        let now = self.clock.now();

        let retention = prune_expired(&self.store, feeds, now).await;
        summary.articles_expired = retention.deleted;
        summary.failures += retention.failures;

        match purge_future(&self.store, now).await {
            Ok(removed) => summary.future_removed = removed,
            Err(e) => {
                warn!("Future-dated article cleanup failed: {}", e);
                summary.failures += 1;
            }
        }

        match collect_stats(&self.store, now).await {
            Ok(stats) => {
                info!(
                    "Store holds {} articles (~{}), oldest {} days old",
                    stats.total_articles,
                    format_bytes(stats.approx_bytes),
                    stats.oldest_age_days.unwrap_or(0)
                );
                for feed in &stats.feeds {
                    debug!(
                        "  {}: {} articles, newest {:?}, oldest {:?}",
                        feed.feed_id, feed.article_count, feed.newest, feed.oldest
                    );
                }
                summary.stats = Some(stats);
            }
            Err(e) => {
                warn!("Statistics collection failed: {}", e);
                summary.failures += 1;
            }
        }

        info!(
            "Cycle complete: {} refreshed, {} added, {} removed, {} failures",
            summary.feeds_refreshed,
            summary.articles_added,
            summary.articles_removed(),
            summary.failures
        );
        Ok(summary)
    }

    /// Fetch, parse and store one feed, then record the attempt.
    async fn refresh_feed(
        &self,
        feed: &FeedDescriptor,
        started: NaiveDateTime,
        summary: &mut CycleSummary,
    ) {
        info!("Fetching {} from {}", feed.display_name(), feed.url);
        summary.feeds_refreshed += 1;

        match self.fetcher.fetch(&feed.url).await {
            Some(bytes) => match parse_document(&bytes, self.options.max_items_per_feed) {
                Ok(raw) => {
                    summary.articles_fetched += raw.len();
                    let articles = to_new_articles(&feed.id, raw, started);
                    self.store_articles(feed, &articles, summary).await;
                }
                Err(e) => {
                    warn!("Feed {}: {}", feed.id, e);
                    summary.failures += 1;
                }
            },
            None => {
                info!("Feed {}: nothing fetched", feed.id);
                summary.failures += 1;
            }
        }

        // Recorded even when nothing was stored, so failing feeds wait out their interval.
        if let Err(e) = self.store.record_feed_attempt(&feed.id, started).await {
            warn!("Feed {}: bookkeeping update failed: {}", feed.id, e);
            summary.failures += 1;
        }
    }

    async fn store_articles(
        &self,
        feed: &FeedDescriptor,
        articles: &[NewArticle],
        summary: &mut CycleSummary,
    ) {
        if articles.is_empty() {
            info!("Feed {}: no articles found", feed.id);
            return;
        }

        match self.store.upsert_articles(&feed.id, articles).await {
            Ok(report) => {
                summary.articles_added += report.inserted;
                summary.articles_updated += report.updated;
                summary.failures += report.failed;
                info!(
                    "Feed {}: {} new, {} updated",
                    feed.id, report.inserted, report.updated
                );
            }
            Err(e) => {
                warn!("Feed {}: storing articles failed: {}", feed.id, e);
                summary.failures += 1;
            }
        }
    }
}

/// Convert parsed items into storable articles.
///
/// Items without a link cannot be keyed and are dropped. Missing titles get a
/// placeholder and missing or unreadable dates fall back to `fetched_at`.
pub fn to_new_articles(
    feed_id: &str,
    raw: Vec<RawArticle>,
    fetched_at: NaiveDateTime,
) -> Vec<NewArticle> {
    raw.into_iter()
        .filter_map(|item| {
            let Some(url) = item.link else {
                debug!(
                    "Feed {}: skipping '{}' without a link",
                    feed_id,
                    item.title.as_deref().unwrap_or(UNTITLED)
                );
                return None;
            };

            let parsed_date = parse_feed_date(item.date.as_deref());
            Some(NewArticle {
                url,
                title: item.title.unwrap_or_else(|| UNTITLED.to_string()),
                published_at: parsed_date.unwrap_or(fetched_at),
                date_from_source: parsed_date.is_some(),
                fetched_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_to_new_articles() {
        let raw = vec![
            RawArticle {
                title: Some("Dated".to_string()),
                link: Some("https://e.com/1".to_string()),
                date: Some("2024-05-30T08:00:00Z".to_string()),
            },
            RawArticle {
                title: None,
                link: Some("https://e.com/2".to_string()),
                date: Some("someday".to_string()),
            },
            RawArticle {
                title: Some("No link".to_string()),
                link: None,
                date: None,
            },
        ];

        let articles = to_new_articles("e", raw, now());
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].title, "Dated");
        assert!(articles[0].date_from_source);
        assert_eq!(
            articles[0].published_at,
            NaiveDate::from_ymd_opt(2024, 5, 30)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );

        assert_eq!(articles[1].title, UNTITLED);
        assert!(!articles[1].date_from_source);
        assert_eq!(articles[1].published_at, now());
        assert_eq!(articles[1].fetched_at, now());
    }

    #[test]
    fn test_default_options() {
        let options = UpdateOptions::default();
        assert_eq!(options.max_items_per_feed, 32);
        assert!(!options.force);
    }
}
