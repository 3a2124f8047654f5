//! End-to-end tests for the update cycle.

mod common;

use chrono::Duration;

use common::{atom_document, rss_document, start_time, StubFetcher};
use newsfeed::news::ArticleRepository;
use newsfeed::{
    ArticleStore, Database, DocumentFetcher, FeedDescriptor, FixedClock, LifetimeSetting,
    NewsError, NewsUpdater, UpdateOptions,
};

const FEED_A: &str = "https://a.example/rss";
const FEED_B: &str = "https://b.example/atom";

#[tokio::test]
async fn test_refresh_zero_is_always_due_and_sixty_waits() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();
    let t = start_time();

    fetcher.serve(
        FEED_A,
        rss_document(&[
            ("A one", "https://a.example/1", t - Duration::hours(2)),
            ("A two", "https://a.example/2", t - Duration::hours(1)),
        ]),
    );
    fetcher.serve(
        FEED_B,
        atom_document(&[("B one", "https://b.example/1", t - Duration::hours(3))]),
    );

    let feeds = vec![
        FeedDescriptor::new("a", FEED_A).with_refresh(0),
        FeedDescriptor::new("b", FEED_B).with_refresh(60),
    ];
    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);

    // First run: nothing recorded yet, both feeds are due
    let first = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(first.feeds_checked, 2);
    assert_eq!(first.feeds_refreshed, 2);
    assert_eq!(first.articles_fetched, 3);
    assert_eq!(first.articles_added, 3);
    assert_eq!(first.failures, 0);
    assert_eq!(fetcher.requests(), vec![FEED_A.to_string(), FEED_B.to_string()]);

    let stats = first.stats.as_ref().unwrap();
    assert_eq!(stats.total_articles, 3);
    assert_eq!(stats.feeds.len(), 2);

    // Second run ten minutes later: only "a" is due
    fetcher.clear_requests();
    clock.advance(Duration::minutes(10));

    let second = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(second.feeds_refreshed, 1);
    assert_eq!(fetcher.requests(), vec![FEED_A.to_string()]);
    assert_eq!(second.articles_added, 0);
    assert_eq!(second.articles_updated, 2);

    let repo = ArticleRepository::new(db.pool());
    let a = repo.get_feed_update("a").await.unwrap().unwrap();
    assert_eq!(a.update_count, 2);
    assert_eq!(a.last_updated, start_time() + Duration::minutes(10));
    let b = repo.get_feed_update("b").await.unwrap().unwrap();
    assert_eq!(b.update_count, 1);

    // Sixty minutes after the first run "b" is due again
    fetcher.clear_requests();
    clock.set(start_time() + Duration::minutes(60));
    let third = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(third.feeds_refreshed, 2);
}

#[tokio::test]
async fn test_force_refreshes_every_feed() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();
    fetcher.serve(
        FEED_A,
        rss_document(&[("A", "https://a.example/1", start_time())]),
    );

    let feeds = vec![FeedDescriptor::new("a", FEED_A).with_refresh(600)];
    let repo = ArticleRepository::new(db.pool());
    repo.record_feed_attempt("a", start_time()).await.unwrap();

    let normal = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);
    assert_eq!(normal.run_cycle(&feeds).await.unwrap().feeds_refreshed, 0);

    let forced = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock)
        .with_options(UpdateOptions {
            force: true,
            ..UpdateOptions::default()
        });
    let summary = forced.run_cycle(&feeds).await.unwrap();
    assert_eq!(summary.feeds_refreshed, 1);
    assert_eq!(summary.articles_added, 1);
}

#[tokio::test]
async fn test_failed_fetch_still_records_attempt() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();

    let feeds = vec![FeedDescriptor::new("down", "https://down.example/rss")];
    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);

    let summary = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(summary.feeds_refreshed, 1);
    assert_eq!(summary.articles_added, 0);
    assert_eq!(summary.failures, 1);

    let repo = ArticleRepository::new(db.pool());
    let record = repo.get_feed_update("down").await.unwrap().unwrap();
    assert_eq!(record.update_count, 1);

    // Within the default 30 minutes the failing feed is left alone
    fetcher.clear_requests();
    clock.advance(Duration::minutes(5));
    let summary = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(summary.feeds_refreshed, 0);
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_document_is_counted_and_cycle_continues() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();
    fetcher.serve(FEED_A, "<rss><channel><item><title>cut off");
    fetcher.serve(
        FEED_B,
        atom_document(&[("B", "https://b.example/1", start_time())]),
    );

    let feeds = vec![
        FeedDescriptor::new("a", FEED_A),
        FeedDescriptor::new("b", FEED_B),
    ];
    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);

    let summary = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(summary.feeds_refreshed, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.articles_added, 1);

    let repo = ArticleRepository::new(db.pool());
    assert!(repo.get_feed_update("a").await.unwrap().is_some());
}

#[tokio::test]
async fn test_retention_and_future_cleanup() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();
    let t = start_time();

    fetcher.serve(
        FEED_A,
        rss_document(&[
            ("fresh", "https://a.example/fresh", t - Duration::days(1)),
            ("stale", "https://a.example/stale", t - Duration::days(4)),
            ("ahead", "https://a.example/ahead", t + Duration::hours(1)),
            ("now", "https://a.example/now", t),
        ]),
    );
    fetcher.serve(
        FEED_B,
        atom_document(&[("ancient", "https://b.example/old", t - Duration::days(400))]),
    );

    let feeds = vec![
        FeedDescriptor::new("a", FEED_A).with_lifetime_days(3.0),
        FeedDescriptor::new("b", FEED_B)
            .with_lifetime(LifetimeSetting::Invalid("a while".to_string())),
    ];
    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);

    let summary = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(summary.articles_added, 5);
    assert_eq!(summary.articles_expired, 1);
    assert_eq!(summary.future_removed, 1);
    assert_eq!(summary.articles_removed(), 2);
    assert_eq!(summary.failures, 0);

    let repo = ArticleRepository::new(db.pool());
    let urls: Vec<String> = repo
        .list_by_feed("a")
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://a.example/now".to_string(),
            "https://a.example/fresh".to_string(),
        ]
    );
    // Non-numeric lifetime: never pruned
    assert_eq!(repo.list_by_feed("b").await.unwrap().len(), 1);

    let stats = summary.stats.unwrap();
    assert_eq!(stats.total_articles, 3);
    assert_eq!(stats.oldest_age_days, Some(400));
}

#[tokio::test]
async fn test_unavailable_store_fails_cycle() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();
    fetcher.serve(FEED_A, rss_document(&[]));

    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);
    db.close().await;

    let result = updater
        .run_cycle(&[FeedDescriptor::new("a", FEED_A)])
        .await;
    assert!(matches!(result, Err(NewsError::DatabaseConnection(_))));
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_empty_feed_list() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = StubFetcher::new();

    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);
    let summary = updater.run_cycle(&[]).await.unwrap();
    assert_eq!(summary.feeds_checked, 0);
    assert_eq!(summary.feeds_refreshed, 0);
    assert_eq!(summary.stats.unwrap().total_articles, 0);
}

/// Fetcher whose requests take `delay` of clock time each.
struct SlowFetcher<'a> {
    inner: StubFetcher,
    clock: &'a FixedClock,
    delay: Duration,
}

impl DocumentFetcher for SlowFetcher<'_> {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.clock.advance(self.delay);
        self.inner.fetch(url).await
    }
}

#[tokio::test]
async fn test_feeds_are_stamped_with_cycle_start() {
    let db = Database::open_in_memory().await.unwrap();
    let clock = FixedClock::new(start_time());
    let fetcher = SlowFetcher {
        inner: StubFetcher::new(),
        clock: &clock,
        delay: Duration::seconds(10),
    };
    fetcher.inner.serve(FEED_A, rss_document(&[]));
    fetcher.inner.serve(FEED_B, atom_document(&[]));

    let feeds = vec![
        FeedDescriptor::new("a", FEED_A).with_refresh(30),
        FeedDescriptor::new("b", FEED_B).with_refresh(30),
    ];
    let updater = NewsUpdater::new(ArticleRepository::new(db.pool()), &fetcher, &clock);

    let first = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(first.feeds_refreshed, 2);

    let repo = ArticleRepository::new(db.pool());
    for id in ["a", "b"] {
        let record = repo.get_feed_update(id).await.unwrap().unwrap();
        assert_eq!(record.last_updated, start_time());
    }

    // Next run exactly one interval after the first one started
    clock.set(start_time() + Duration::minutes(30));
    let second = updater.run_cycle(&feeds).await.unwrap();
    assert_eq!(second.feeds_refreshed, 2);
}
