//! Async HTTP client wrapping reqwest.
//!
//! Not a browser — just HTTP requests. Handles redirects, timeouts,
//! retry on 5xx, backoff on 429, and an HTTP/1.1 fallback for sites that
//! reject HTTP/2.

use anyhow::Result;
use std::time::Duration;

const USER_AGENT: &str = "FormscoutBot/0.1 (contact-channel audit tool)";

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header, when present.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
    }
}

/// HTTP client for the crawl controller.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client.
    h1_client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout_ms: u64) -> Self {
        let build = |h1_only: bool| {
            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .redirect(reqwest::redirect::Policy::limited(5))
                .user_agent(USER_AGENT);
            if h1_only {
                builder = builder.http1_only();
            }
            builder.build().unwrap_or_default()
        };
        Self {
            client: build(false),
            h1_client: build(true),
        }
    }

    /// Perform a single GET request with retry on 5xx and backoff on 429.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse> {
        match self.get_inner(&self.client, url, timeout_ms).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                let err_str = format!("{e}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    self.get_inner(&self.h1_client, url, timeout_ms).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_inner(
        &self,
        client: &reqwest::Client,
        url: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        let mut retries = 0u32;
        let max_retries = 2;

        loop {
            let resp = client
                .get(url)
                .timeout(Duration::from_millis(timeout_ms))
                .send()
                .await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();
                    let final_url = r.url().to_string();

                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status == 429 && retries < max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    let content_type = r
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let body = r.text().await.unwrap_or_default();

                    return Ok(HttpResponse {
                        url: url.to_string(),
                        final_url,
                        status,
                        content_type,
                        body,
                    });
                }
                Err(e) => {
                    if retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_does_not_panic() {
        let client = HttpClient::new(10_000);
        let _ = client;
    }

    #[test]
    fn html_detection_reads_content_type() {
        let resp = HttpResponse {
            url: "https://example.com".to_string(),
            final_url: "https://example.com".to_string(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: String::new(),
        };
        assert!(resp.is_html());

        let pdf = HttpResponse {
            content_type: Some("application/pdf".to_string()),
            ..resp.clone()
        };
        assert!(!pdf.is_html());

        let missing = HttpResponse {
            content_type: None,
            ..resp
        };
        assert!(!missing.is_html());
    }
}
