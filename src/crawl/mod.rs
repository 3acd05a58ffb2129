//! Per-domain crawl controller.
//!
//! Breadth-first over same-host pages within a fixed page budget, with
//! contact-looking URLs jumping the queue. Successive fetches to the host
//! respect a minimum delay. Each fetched page feeds the form and email
//! extractors; protection flags are derived fresh per page.

pub mod http_client;

use crate::extract::emails::{self, EmailCandidate};
use crate::extract::forms::{self, FormCandidate};
use crate::extract::links;
use crate::lexicon::FieldLexicon;
use crate::protection;
use anyhow::{Context, Result};
use http_client::HttpClient;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Crawl budget and pacing.
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    /// Pages fetched per domain, at most.
    pub max_pages: usize,
    /// Minimum delay between successive fetches to the same host.
    pub fetch_delay: Duration,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_pages: 10,
            fetch_delay: Duration::from_secs(1),
            timeout_ms: 30_000,
        }
    }
}

/// Everything a domain crawl produced, in deterministic crawl order.
#[derive(Debug, Default)]
pub struct PageHarvest {
    pub forms: Vec<FormCandidate>,
    pub emails: Vec<EmailCandidate>,
    pub pages_fetched: usize,
}

/// Drives page discovery for one domain and feeds the extractors.
pub struct Crawler<'a> {
    client: &'a HttpClient,
    lexicon: &'a FieldLexicon,
    limits: CrawlLimits,
}

impl<'a> Crawler<'a> {
    pub fn new(client: &'a HttpClient, lexicon: &'a FieldLexicon, limits: CrawlLimits) -> Self {
        Self {
            client,
            lexicon,
            limits,
        }
    }

    /// Crawl the domain and harvest form and email candidates.
    pub async fn crawl(&self, domain: &str) -> Result<PageHarvest> {
        let base = normalize_domain_url(domain);
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid domain {domain:?}"))?;
        let host = base_url
            .host_str()
            .with_context(|| format!("domain {domain:?} has no host"))?
            .to_string();

        let mut harvest = PageHarvest::default();
        let mut seen_emails: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([base]);
        let mut last_fetch: Option<Instant> = None;

        while let Some(url) = queue.pop_front() {
            if visited.len() >= self.limits.max_pages {
                break;
            }
            if !visited.insert(url.clone()) {
                continue;
            }

            // Per-host pacing; other domains are not serialized by this.
            if let Some(at) = last_fetch {
                let since = at.elapsed();
                if since < self.limits.fetch_delay {
                    tokio::time::sleep(self.limits.fetch_delay - since).await;
                }
            }
            last_fetch = Some(Instant::now());

            debug!(url, "fetching");
            let resp = match self.client.get(&url, self.limits.timeout_ms).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(url, error = %e, "fetch failed, skipping page");
                    continue;
                }
            };
            harvest.pages_fetched += 1;
            if resp.status != 200 || !resp.is_html() {
                debug!(url, status = resp.status, "skipping non-HTML or non-200 page");
                continue;
            }

            for extracted in forms::extract(&resp.final_url, &resp.body, self.lexicon) {
                let flags = protection::detect(&extracted, &resp.body);
                harvest.forms.push(extracted.into_candidate(flags));
            }

            for candidate in emails::extract(&resp.final_url, &resp.body) {
                if seen_emails.insert(candidate.address.to_lowercase()) {
                    harvest.emails.push(candidate);
                }
            }

            for link in links::extract(&resp.final_url, &resp.body, &host) {
                if visited.contains(&link) || queue.contains(&link) {
                    continue;
                }
                if links::looks_like_contact_page(&link) {
                    queue.push_front(link);
                } else {
                    queue.push_back(link);
                }
            }
        }

        debug!(
            domain,
            pages = harvest.pages_fetched,
            forms = harvest.forms.len(),
            emails = harvest.emails.len(),
            "crawl finished"
        );
        Ok(harvest)
    }
}

/// Bare domains become https URLs; explicit schemes are kept.
pub fn normalize_domain_url(domain: &str) -> String {
    let trimmed = domain.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domains_get_https_scheme() {
        assert_eq!(normalize_domain_url("site.com"), "https://site.com/");
        assert_eq!(
            normalize_domain_url("http://site.com/x"),
            "http://site.com/x"
        );
    }

    #[test]
    fn default_limits_match_operator_expectations() {
        let limits = CrawlLimits::default();
        assert_eq!(limits.max_pages, 10);
        assert_eq!(limits.fetch_delay, Duration::from_secs(1));
    }
}
