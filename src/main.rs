use std::process::ExitCode;

use tracing::{error, info};

use newsfeed::{
    ArticleRepository, Config, Database, HttpFetcher, NewsUpdater, SystemClock, UpdateOptions,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut force = false;
    for arg in std::env::args().skip(1) {
        if arg == "--force" {
            force = true;
        } else {
            config_path = arg;
        }
    }

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = newsfeed::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        newsfeed::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let feeds = config.feed_descriptors();
    info!(
        "newsfeed {} starting: {} feed(s){}",
        env!("CARGO_PKG_VERSION"),
        feeds.len(),
        if force { ", forced refresh" } else { "" }
    );

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::new(&config.fetch) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("{}", e);
            db.close().await;
            return ExitCode::FAILURE;
        }
    };

    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), fetcher, SystemClock)
        .with_options(UpdateOptions {
            max_items_per_feed: config.fetch.max_items_per_feed,
            force,
        });

    let result = updater.run_cycle(&feeds).await;
    db.close().await;

    match result {
        Ok(summary) => {
            info!(
                "Checked {} feed(s), refreshed {}, added {} article(s), removed {}",
                summary.feeds_checked,
                summary.feeds_refreshed,
                summary.articles_added,
                summary.articles_removed()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Update cycle failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
