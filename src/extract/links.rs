//! Crawl-link harvesting — same-host links, contact pages first.

use scraper::{Html, Selector};
use url::Url;

/// URL fragments that mark a likely contact page, across the languages the
/// lexicon covers.
const CONTACT_HINTS: &[&str] = &[
    "contact",
    "contacto",
    "kontakt",
    "contact-us",
    "reach-us",
    "get-in-touch",
    "impressum",
];

/// Schemes and pseudo-links a crawler never follows.
const SKIP_PREFIXES: &[&str] = &["#", "javascript:", "mailto:", "tel:"];

/// Harvest followable same-host links from a page, in document order.
/// Fragments are stripped so `/about#team` and `/about` dedupe upstream.
pub fn extract(page_url: &str, html: &str, host: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for anchor in document.select(&sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || SKIP_PREFIXES.iter().any(|p| href.starts_with(p)) {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str() != Some(host) {
            continue;
        }
        resolved.set_fragment(None);
        links.push(resolved.to_string());
    }
    links
}

/// Whether a URL looks like a contact page; such links jump the crawl queue.
pub fn looks_like_contact_page(url: &str) -> bool {
    let lower = url.to_lowercase();
    CONTACT_HINTS.iter().any(|hint| lower.contains(hint))
}
