//! Refresh scheduling.
//!
//! A feed is due when it has never been fetched, or when at least its refresh
//! interval has passed since the last recorded attempt (exactly equal counts).

use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};

use super::store::ArticleStore;
use super::types::FeedDescriptor;

/// Why a feed is or is not due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// No bookkeeping yet.
    NeverUpdated,
    /// The interval has elapsed.
    Due { elapsed_minutes: i64 },
    /// Waiting for the interval to elapse.
    NotDue { minutes_remaining: i64 },
    /// The last attempt lies after `now`; the clock moved backwards.
    ClockSkew,
    /// Bookkeeping could not be read; the feed is skipped this cycle.
    Unknown,
}

impl Disposition {
    pub fn is_due(&self) -> bool {
        matches!(
            self,
            Self::NeverUpdated | Self::Due { .. } | Self::ClockSkew
        )
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverUpdated => write!(f, "due (never updated)"),
            Self::Due { elapsed_minutes } => {
                write!(f, "due ({} minutes since last update)", elapsed_minutes)
            }
            Self::NotDue { minutes_remaining } => {
                write!(f, "not due ({} minutes remaining)", minutes_remaining)
            }
            Self::ClockSkew => write!(f, "due (last update is in the future)"),
            Self::Unknown => write!(f, "skipped (bookkeeping unavailable)"),
        }
    }
}

/// Scheduling decision for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDisposition {
    pub feed_id: String,
    pub last_updated: Option<NaiveDateTime>,
    pub disposition: Disposition,
    /// Due because of force mode, regardless of `disposition`.
    pub forced: bool,
}

impl FeedDisposition {
    pub fn is_due(&self) -> bool {
        self.forced || self.disposition.is_due()
    }
}

/// Decide whether a feed with the given interval and last update is due at `now`.
pub fn evaluate(
    refresh_minutes: i64,
    last_updated: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Disposition {
    let Some(last) = last_updated else {
        return Disposition::NeverUpdated;
    };

    let elapsed = now.signed_duration_since(last);
    if elapsed < TimeDelta::zero() {
        return Disposition::ClockSkew;
    }

    let interval = TimeDelta::try_minutes(refresh_minutes.max(0)).unwrap_or(TimeDelta::MAX);
    if elapsed >= interval {
        Disposition::Due {
            elapsed_minutes: elapsed.num_minutes(),
        }
    } else {
        let remaining = interval - elapsed;
        // Round partial minutes up so "0 minutes remaining" never means not due.
        let minutes_remaining = (remaining.num_seconds() + 59) / 60;
        Disposition::NotDue { minutes_remaining }
    }
}

/// Compute a disposition for every feed, in configuration order.
///
/// A bookkeeping read failure makes that feed `Unknown` (not due) unless
/// `force` is set.
pub async fn plan_refresh<S: ArticleStore>(
    store: &S,
    feeds: &[FeedDescriptor],
    now: NaiveDateTime,
    force: bool,
) -> Vec<FeedDisposition> {
    let mut plan = Vec::with_capacity(feeds.len());

    for feed in feeds {
        let (last_updated, disposition) = match store.get_last_updated(&feed.id).await {
            Ok(last) => (last, evaluate(feed.refresh_minutes, last, now)),
            Err(e) => {
                warn!("Feed {}: bookkeeping lookup failed: {}", feed.id, e);
                (None, Disposition::Unknown)
            }
        };

        if disposition == Disposition::ClockSkew {
            warn!(
                "Feed {}: last update {:?} is after now ({}); treating as due",
                feed.id, last_updated, now
            );
        }

        let entry = FeedDisposition {
            feed_id: feed.id.clone(),
            last_updated,
            disposition,
            forced: force,
        };
        if entry.forced && !entry.disposition.is_due() {
            info!("Feed {}: {}, forced", feed.display_name(), entry.disposition);
        } else {
            debug!("Feed {}: {}", feed.display_name(), entry.disposition);
        }
        plan.push(entry);
    }

    plan
}
