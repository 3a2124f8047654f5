//! Test helpers for update cycle tests.
//!
//! Provides a canned-response fetcher and helpers for building feed documents.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use newsfeed::DocumentFetcher;

/// Fetcher that serves canned documents and records every request.
#[derive(Default)]
pub struct StubFetcher {
    documents: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`. Unknown URLs fail.
    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    /// Stop serving `url`.
    pub fn fail(&self, url: &str) {
        self.documents.lock().unwrap().remove(url);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl DocumentFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.documents.lock().unwrap().get(url).cloned()
    }
}

/// 2024-06-01 12:00:00, the start instant used by the cycle tests.
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Build an RSS 2.0 document from `(title, link, published)` triples.
pub fn rss_document(items: &[(&str, &str, NaiveDateTime)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title>"#,
    );
    for (title, link, published) in items {
        xml.push_str(&format!(
            "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate></item>",
            title,
            link,
            published.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

/// Build an Atom document from `(title, link, published)` triples.
pub fn atom_document(entries: &[(&str, &str, NaiveDateTime)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Test Feed</title>"#,
    );
    for (title, link, published) in entries {
        xml.push_str(&format!(
            r#"<entry><title>{}</title><link rel="alternate" href="{}"/><published>{}</published></entry>"#,
            title,
            link,
            published.format("%Y-%m-%dT%H:%M:%SZ")
        ));
    }
    xml.push_str("</feed>");
    xml
}
