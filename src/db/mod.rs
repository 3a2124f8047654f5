//! Database module for newsfeed.
//!
//! This module provides pooled connectivity through sqlx's `any` driver and
//! migration management. The backend is picked from the connection URL; the
//! `sqlite` and `postgres` cargo features decide which drivers are compiled in.

mod schema;

pub use schema::MIGRATIONS;

use std::path::Path;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::datetime;
use crate::{NewsError, Result};

/// Connection pool shared by the repositories.
pub type DbPool = AnyPool;

/// Relational backend behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    /// Determine the backend from a connection URL's scheme.
    ///
    /// Fails for unknown schemes and for backends this build was compiled without.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();

        let backend = match scheme.as_str() {
            "sqlite" => Self::Sqlite,
            "postgres" | "postgresql" => Self::Postgres,
            "" => {
                return Err(NewsError::Config(format!(
                    "database url '{url}' has no scheme"
                )))
            }
            other => {
                return Err(NewsError::Config(format!(
                    "unsupported database backend '{other}'"
                )))
            }
        };

        if !backend.is_compiled() {
            return Err(NewsError::Config(format!(
                "{} support is not compiled in (enable the '{}' feature)",
                backend.name(),
                backend.feature()
            )));
        }
        Ok(backend)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
        }
    }

    fn feature(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    fn is_compiled(self) -> bool {
        match self {
            Self::Sqlite => cfg!(feature = "sqlite"),
            Self::Postgres => cfg!(feature = "postgres"),
        }
    }
}

/// Database wrapper for the connection pool and migrations.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect using the given configuration.
    ///
    /// For file-backed SQLite the parent directory is created and the file is
    /// created on first use. Migrations are automatically applied.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let backend = DatabaseBackend::from_url(&config.url)?;
        sqlx::any::install_default_drivers();

        let url = match backend {
            DatabaseBackend::Sqlite => prepare_sqlite_url(&config.url)?,
            DatabaseBackend::Postgres => config.url.clone(),
        };
        info!("Opening {} database", backend.name());

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(&url)
            .await
            .map_err(|e| NewsError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory SQLite database for testing.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        sqlx::any::install_default_drivers();

        // A single connection that never expires keeps the in-memory database alive.
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| NewsError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        self.ensure_version_table().await?;
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    async fn ensure_version_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     BIGINT NOT NULL PRIMARY KEY,
                applied_at  TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;
        let migrations = MIGRATIONS;

        if current_version as usize >= migrations.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            migrations.len()
        );

        for (i, statements) in migrations.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            for statement in statements.iter().copied() {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            let applied_at = datetime::to_storage(&chrono::Utc::now().naive_utc());
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES ($1, $2)")
                .bind(version)
                .bind(applied_at)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            migrations.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

/// Create the database file's directory and make sure SQLite may create the file.
fn prepare_sqlite_url(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    if path.is_empty() || path == ":memory:" {
        return Ok(url.to_string());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(match query {
        Some(q) if q.split('&').any(|kv| kv.starts_with("mode=")) => url.to_string(),
        Some(_) => format!("{url}&mode=rwc"),
        None => format!("{url}?mode=rwc"),
    })
}
