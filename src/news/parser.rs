//! Feed document parsing.
//!
//! RSS (0.9x/1.0/2.0) `item` elements are looked up anywhere in the document,
//! ignoring namespaces. Only when a document has no items at all is it read as
//! Atom. Malformed documents yield no articles.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, warn};

use super::types::RawArticle;
use crate::{NewsError, Result};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Parse raw feed bytes into at most `max_items` raw articles.
///
/// Malformed documents are logged and yield an empty list.
pub fn parse_feed(bytes: &[u8], max_items: usize) -> Vec<RawArticle> {
    parse_document(bytes, max_items).unwrap_or_else(|e| {
        warn!("{}", e);
        Vec::new()
    })
}

/// Parse raw feed bytes, reporting malformed XML as [`NewsError::Parse`].
///
/// Items with neither a title nor a link are skipped. The cap applies to the
/// elements read from the document, so skipped items count against it.
pub fn parse_document(bytes: &[u8], max_items: usize) -> Result<Vec<RawArticle>> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| NewsError::Parse(format!("malformed feed document: {}", e)))?;

    let items: Vec<Node> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "item")
        .collect();

    let articles: Vec<RawArticle> = if items.is_empty() {
        doc.descendants()
            .filter(|n| is_atom(n, "entry"))
            .take(max_items)
            .map(|entry| atom_entry(&entry))
            .filter(has_title_or_link)
            .collect()
    } else {
        items
            .iter()
            .take(max_items)
            .map(rss_item)
            .filter(has_title_or_link)
            .collect()
    };

    debug!("Parsed {} articles from feed document", articles.len());
    Ok(articles)
}

fn has_title_or_link(article: &RawArticle) -> bool {
    article.title.is_some() || article.link.is_some()
}

fn rss_item(item: &Node) -> RawArticle {
    let link = child_text(item, |n| n.tag_name().name() == "link").or_else(|| {
        child_text(item, |n| n.tag_name().name() == "guid").filter(|g| g.starts_with("http"))
    });
    let date = child_text(item, |n| n.tag_name().name() == "pubDate")
        .or_else(|| child_text(item, |n| n.tag_name().name() == "date"));

    RawArticle {
        title: child_text(item, |n| n.tag_name().name() == "title"),
        link,
        date,
    }
}

fn atom_entry(entry: &Node) -> RawArticle {
    let link = atom_link(entry).or_else(|| {
        child_text(entry, |n| is_atom(n, "id")).filter(|id| id.starts_with("http"))
    });
    let date = child_text(entry, |n| is_atom(n, "published"))
        .or_else(|| child_text(entry, |n| is_atom(n, "updated")));

    RawArticle {
        title: child_text(entry, |n| is_atom(n, "title")),
        link,
        date,
    }
}

/// `rel="alternate"` (or no `rel`, which means the same) wins; otherwise the
/// first link with an href.
fn atom_link(entry: &Node) -> Option<String> {
    let hrefs: Vec<(Option<&str>, String)> = entry
        .children()
        .filter(|n| is_atom(n, "link"))
        .filter_map(|n| {
            let href = n.attribute("href")?.trim();
            (!href.is_empty()).then(|| (n.attribute("rel"), href.to_string()))
        })
        .collect();

    hrefs
        .iter()
        .find(|(rel, _)| matches!(rel.map(str::trim), None | Some("alternate")))
        .or_else(|| hrefs.first())
        .map(|(_, href)| href.clone())
}

fn is_atom(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(ATOM_NS)
}

/// Trimmed text of the first matching child element with non-empty text.
fn child_text<F>(node: &Node, matches: F) -> Option<String>
where
    F: Fn(&Node) -> bool,
{
    node.children()
        .filter(|child| child.is_element() && matches(child))
        .find_map(|child| {
            let text: String = child
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}
