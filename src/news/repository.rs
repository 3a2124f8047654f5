//! News repositories for newsfeed.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::store::ArticleStore;
use super::types::{Article, ArticleTotals, FeedStats, FeedUpdateRecord, NewArticle, UpsertReport};
use crate::datetime::{from_storage, to_storage};
use crate::db::DbPool;
use crate::{NewsError, Result};

/// Row type for a stored article.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    feed_id: String,
    url: String,
    title: String,
    published_date: String,
    created_at: String,
}

impl ArticleRow {
    fn into_article(self, fallback: NaiveDateTime) -> Article {
        Article {
            feed_id: self.feed_id,
            url: self.url,
            title: self.title,
            published_at: from_storage(&self.published_date).unwrap_or(fallback),
            created_at: from_storage(&self.created_at).unwrap_or(fallback),
        }
    }
}

/// Row type for feed bookkeeping.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedUpdateRow {
    feed_id: String,
    last_updated: String,
    last_check: String,
    update_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TotalsRow {
    total: i64,
    oldest: Option<String>,
    approx_bytes: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedStatsRow {
    feed_id: String,
    article_count: i64,
    newest: Option<String>,
    oldest: Option<String>,
}

/// Repository for articles and feed bookkeeping.
pub struct ArticleRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new repository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    async fn upsert_one(&self, feed_id: &str, article: &NewArticle) -> Result<bool> {
        let published = to_storage(&article.published_at);

        let result = sqlx::query(
            r#"
            INSERT INTO news_articles (feed_id, url, title, published_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (feed_id, url) DO NOTHING
            "#,
        )
        .bind(feed_id)
        .bind(&article.url)
        .bind(&article.title)
        .bind(&published)
        .bind(to_storage(&article.fetched_at))
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Already stored. A publish time that only came from the fetch clock
        // must not move the stored one forward, or undated articles never expire.
        if article.date_from_source {
            sqlx::query(
                r#"
                UPDATE news_articles SET title = $1, published_date = $2
                WHERE feed_id = $3 AND url = $4
                "#,
            )
            .bind(&article.title)
            .bind(&published)
            .bind(feed_id)
            .bind(&article.url)
            .execute(self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE news_articles SET title = $1 WHERE feed_id = $2 AND url = $3")
                .bind(&article.title)
                .bind(feed_id)
                .bind(&article.url)
                .execute(self.pool)
                .await?;
        }
        Ok(false)
    }

    /// Get the bookkeeping record for a feed.
    pub async fn get_feed_update(&self, feed_id: &str) -> Result<Option<FeedUpdateRecord>> {
        let row = sqlx::query_as::<_, FeedUpdateRow>(
            r#"
            SELECT feed_id, last_updated, last_check, update_count
            FROM feed_updates
            WHERE feed_id = $1
            "#,
        )
        .bind(feed_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let parse = |s: &str| {
            from_storage(s).ok_or_else(|| {
                NewsError::Database(format!("invalid timestamp '{}' for feed {}", s, row.feed_id))
            })
        };
        Ok(Some(FeedUpdateRecord {
            last_updated: parse(&row.last_updated)?,
            last_check: parse(&row.last_check)?,
            update_count: row.update_count,
            feed_id: row.feed_id.clone(),
        }))
    }

    /// List a feed's articles, newest first.
    pub async fn list_by_feed(&self, feed_id: &str) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT feed_id, url, title, published_date, created_at
            FROM news_articles
            WHERE feed_id = $1
            ORDER BY published_date DESC, url ASC
            "#,
        )
        .bind(feed_id)
        .fetch_all(self.pool)
        .await?;

        let fallback = NaiveDateTime::default();
        Ok(rows.into_iter().map(|r| r.into_article(fallback)).collect())
    }

    /// Count all stored articles.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_articles")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

impl ArticleStore for ArticleRepository<'_> {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool)
            .await
            .map_err(|e| NewsError::DatabaseConnection(e.to_string()))?;
        Ok(())
    }

    async fn upsert_articles(&self, feed_id: &str, articles: &[NewArticle]) -> Result<UpsertReport> {
        let mut report = UpsertReport::default();

        for article in articles {
            match self.upsert_one(feed_id, article).await {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    warn!("Feed {}: failed to store {}: {}", feed_id, article.url, e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Feed {}: {} inserted, {} updated, {} failed",
            feed_id, report.inserted, report.updated, report.failed
        );
        Ok(report)
    }

    async fn record_feed_attempt(&self, feed_id: &str, when: NaiveDateTime) -> Result<()> {
        let when = to_storage(&when);
        sqlx::query(
            r#"
            INSERT INTO feed_updates (feed_id, last_updated, last_check, update_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (feed_id) DO UPDATE SET
                last_updated = excluded.last_updated,
                last_check = excluded.last_check,
                update_count = feed_updates.update_count + 1
            "#,
        )
        .bind(feed_id)
        .bind(&when)
        .bind(&when)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn get_last_updated(&self, feed_id: &str) -> Result<Option<NaiveDateTime>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT last_updated FROM feed_updates WHERE feed_id = $1")
                .bind(feed_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(value.and_then(|s| {
            let parsed = from_storage(&s);
            if parsed.is_none() {
                warn!("Feed {}: unreadable last_updated '{}'", feed_id, s);
            }
            parsed
        }))
    }

    async fn delete_expired(&self, feed_ids: &[String], cutoff: NaiveDateTime) -> Result<u64> {
        if feed_ids.is_empty() {
            return Ok(0);
        }

        let placeholders: Vec<String> = (0..feed_ids.len()).map(|i| format!("${}", i + 2)).collect();
        let sql = format!(
            "DELETE FROM news_articles WHERE published_date < $1 AND feed_id IN ({})",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(to_storage(&cutoff));
        for feed_id in feed_ids {
            query = query.bind(feed_id);
        }

        let result = query.execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_future(&self, now: NaiveDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM news_articles WHERE published_date > $1")
            .bind(to_storage(&now))
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn article_totals(&self) -> Result<ArticleTotals> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   MIN(published_date) AS oldest,
                   COALESCE(SUM(LENGTH(feed_id) + LENGTH(url) + LENGTH(title)
                                + LENGTH(published_date) + LENGTH(created_at)), 0) AS approx_bytes
            FROM news_articles
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(ArticleTotals {
            total: row.total,
            oldest: row.oldest.as_deref().and_then(from_storage),
            approx_bytes: row.approx_bytes,
        })
    }

    async fn feed_stats(&self) -> Result<Vec<FeedStats>> {
        let rows = sqlx::query_as::<_, FeedStatsRow>(
            r#"
            SELECT feed_id,
                   COUNT(*) AS article_count,
                   MAX(published_date) AS newest,
                   MIN(published_date) AS oldest
            FROM news_articles
            GROUP BY feed_id
            ORDER BY feed_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| FeedStats {
                newest: r.newest.as_deref().and_then(from_storage),
                oldest: r.oldest.as_deref().and_then(from_storage),
                feed_id: r.feed_id,
                article_count: r.article_count,
            })
            .collect())
    }
}
