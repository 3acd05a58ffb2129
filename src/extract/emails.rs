//! Contact email extraction from page content.
//!
//! Two independent methods run and their results are unioned: `mailto:`
//! anchor targets and an email-shaped pattern over visible text. Addresses
//! are normalized (lower-cased domain part) before dedup; insertion order is
//! preserved so "first found in crawl order" stays deterministic.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// How an address was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    MailtoLink,
    TextPattern,
}

/// A contact address found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCandidate {
    pub address: String,
    pub source_url: String,
    pub method: ExtractionMethod,
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .unwrap_or_else(|e| unreachable!("email pattern is valid: {e}"))
    })
}

fn email_exact() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .unwrap_or_else(|e| unreachable!("email pattern is valid: {e}"))
    })
}

/// Extract the page's email candidates, deduplicated, in discovery order.
pub fn extract(page_url: &str, html: &str) -> Vec<EmailCandidate> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    // Method (a): mailto: anchors. The URL parser strips the query part
    // (subject=..., body=...) and percent-decoding for us.
    if let Ok(sel) = Selector::parse(r#"a[href^="mailto:"]"#) {
        for anchor in document.select(&sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(address) = mailto_address(href) {
                push_candidate(
                    &mut out,
                    &mut seen,
                    address,
                    page_url,
                    ExtractionMethod::MailtoLink,
                );
            }
        }
    }

    // Method (b): email-shaped tokens in visible text.
    let text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    for m in email_pattern().find_iter(&text) {
        push_candidate(
            &mut out,
            &mut seen,
            m.as_str().to_string(),
            page_url,
            ExtractionMethod::TextPattern,
        );
    }

    out
}

fn push_candidate(
    out: &mut Vec<EmailCandidate>,
    seen: &mut HashSet<String>,
    address: String,
    page_url: &str,
    method: ExtractionMethod,
) {
    let normalized = normalize_address(&address);
    if !is_valid(&normalized) {
        return;
    }
    if seen.insert(normalized.to_lowercase()) {
        out.push(EmailCandidate {
            address: normalized,
            source_url: page_url.to_string(),
            method,
        });
    }
}

/// The address component of a `mailto:` href, percent-decoded, query
/// stripped.
fn mailto_address(href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(url) if url.scheme() == "mailto" => {
            let path = url.path();
            let decoded = percent_decode(path);
            // A mailto may list several recipients; take the first.
            let first = decoded.split(',').next().unwrap_or(&decoded);
            Some(first.trim().to_string())
        }
        _ => {
            // Malformed href; salvage what sits between the scheme and any
            // query string.
            let rest = href.strip_prefix("mailto:")?;
            let before_query = rest.split('?').next().unwrap_or(rest);
            Some(percent_decode(before_query).trim().to_string())
        }
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            // get() handles both truncated escapes and escapes followed by
            // a multibyte character.
            if let Some(v) = s
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Lower-case the domain part; the local part is preserved.
fn normalize_address(address: &str) -> String {
    match address.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => address.to_string(),
    }
}

fn is_valid(address: &str) -> bool {
    email_exact().is_match(address)
}
