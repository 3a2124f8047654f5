//! newsfeed - Feed refresh and retention engine
//!
//! Pulls configured RSS/Atom feeds into a relational store (SQLite or
//! PostgreSQL) and prunes stored articles by per-feed lifetime.

pub mod clock;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod news;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use db::{Database, DatabaseBackend, DbPool};
pub use error::{NewsError, Result};
pub use news::{
    ArticleRepository, ArticleStore, CycleSummary, DocumentFetcher, FeedDescriptor, HttpFetcher,
    LifetimeSetting, NewsUpdater, UpdateOptions,
};
