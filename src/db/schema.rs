//! Database schema and migrations for newsfeed.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.
//!
//! The DDL must run unchanged on SQLite and PostgreSQL: only `TEXT` and
//! `BIGINT` columns, no backend-specific defaults. Instants are stored as
//! `YYYY-MM-DD HH:MM:SS` text (see [`crate::datetime::STORAGE_FORMAT`]).

/// Database migrations.
///
/// Each migration is a list of single SQL statements executed in order inside
/// one transaction. The schema_version table tracks which migrations have been
/// applied.
pub const MIGRATIONS: &[&[&str]] = &[
    // v1: Articles and per-feed bookkeeping
    &[
        r#"
CREATE TABLE news_articles (
    feed_id         TEXT NOT NULL,
    url             TEXT NOT NULL,
    title           TEXT NOT NULL,
    published_date  TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (feed_id, url)
)
"#,
        r#"
CREATE TABLE feed_updates (
    feed_id       TEXT NOT NULL PRIMARY KEY,
    last_updated  TEXT NOT NULL,
    last_check    TEXT NOT NULL,
    update_count  BIGINT NOT NULL DEFAULT 0
)
"#,
    ],
    // v2: Indexes for retention and sanitizer scans
    &[
        "CREATE INDEX idx_news_articles_published ON news_articles (published_date)",
        "CREATE INDEX idx_news_articles_feed_published ON news_articles (feed_id, published_date)",
    ],
];
