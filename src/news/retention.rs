//! Retention pruning.
//!
//! Feeds sharing a lifetime are grouped into one bucket and pruned with a
//! single statement per bucket.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};

use super::store::ArticleStore;
use super::types::{FeedDescriptor, LifetimeSetting};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Feeds that share one retention horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionBucket {
    /// Lifetime in days, finite and positive.
    pub days: f64,
    /// Feed ids in configuration order.
    pub feed_ids: Vec<String>,
}

impl RetentionBucket {
    /// Lifetime as written in logs: whole numbers without a fractional part.
    pub fn label(&self) -> String {
        if self.days.fract() == 0.0 && self.days < i64::MAX as f64 {
            format!("{}", self.days as i64)
        } else {
            format!("{}", self.days)
        }
    }

    /// Articles published before the returned instant are expired.
    ///
    /// `None` when the horizon reaches past the representable range.
    pub fn cutoff(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let millis = (self.days * MILLIS_PER_DAY).round();
        if millis >= i64::MAX as f64 {
            return None;
        }
        TimeDelta::try_milliseconds(millis as i64).and_then(|d| now.checked_sub_signed(d))
    }
}

/// Outcome of one pruning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub deleted: u64,
    pub buckets: usize,
    pub failures: usize,
}

/// Group feeds with a finite positive lifetime by that lifetime.
///
/// Unset and non-positive lifetimes keep articles forever; non-numeric ones
/// are logged and skipped. Buckets are ordered by lifetime.
pub fn plan_buckets(feeds: &[FeedDescriptor]) -> Vec<RetentionBucket> {
    let mut buckets: BTreeMap<u64, Vec<String>> = BTreeMap::new();

    for feed in feeds {
        match &feed.lifetime {
            LifetimeSetting::Unset => {}
            LifetimeSetting::Invalid(raw) => {
                warn!(
                    "Feed {}: lifetime '{}' is not a number; not pruning",
                    feed.id, raw
                );
            }
            LifetimeSetting::Days(days) if days.is_nan() => {
                warn!("Feed {}: lifetime is not a number; not pruning", feed.id);
            }
            LifetimeSetting::Days(days) if *days <= 0.0 || days.is_infinite() => {
                debug!("Feed {}: lifetime {} keeps articles forever", feed.id, days);
            }
            LifetimeSetting::Days(days) => {
                // Positive finite floats order the same as their bit patterns.
                buckets
                    .entry(days.to_bits())
                    .or_default()
                    .push(feed.id.clone());
            }
        }
    }

    buckets
        .into_iter()
        .map(|(bits, feed_ids)| RetentionBucket {
            days: f64::from_bits(bits),
            feed_ids,
        })
        .collect()
}

/// Delete expired articles, one statement per bucket.
///
/// A failing bucket is logged and counted; the remaining buckets still run.
pub async fn prune_expired<S: ArticleStore>(
    store: &S,
    feeds: &[FeedDescriptor],
    now: NaiveDateTime,
) -> RetentionReport {
    let buckets = plan_buckets(feeds);
    let mut report = RetentionReport {
        buckets: buckets.len(),
        ..Default::default()
    };

    if buckets.is_empty() {
        debug!("No feed has a finite lifetime; nothing to prune");
        return report;
    }

    for bucket in &buckets {
        let Some(cutoff) = bucket.cutoff(now) else {
            debug!("Lifetime {} days reaches before any stored date", bucket.label());
            continue;
        };

        match store.delete_expired(&bucket.feed_ids, cutoff).await {
            Ok(deleted) => {
                if deleted > 0 {
                    info!(
                        "Removed {} articles older than {} days from {}",
                        deleted,
                        bucket.label(),
                        bucket.feed_ids.join(", ")
                    );
                }
                report.deleted += deleted;
            }
            Err(e) => {
                warn!(
                    "Retention for {} ({} days) failed: {}",
                    bucket.feed_ids.join(", "),
                    bucket.label(),
                    e
                );
                report.failures += 1;
            }
        }
    }

    report
}
