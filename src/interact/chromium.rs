//! Chromium-based form interactor using chromiumoxide.

use super::{FormInteractor, Submission};
use crate::config::TestProfile;
use crate::extract::forms::FormCandidate;
use crate::orchestrate::{AttemptError, TransientKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Submit-control selectors tried in order when the form declares none.
const SUBMIT_SELECTORS: &[&str] = &[
    "button[type='submit']",
    "input[type='submit']",
    "form button",
];

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FORMSCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("FORMSCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless-Chromium implementation of [`FormInteractor`].
pub struct ChromiumInteractor {
    browser: OnceCell<Browser>,
    evidence_dir: PathBuf,
    timeout_ms: u64,
}

impl ChromiumInteractor {
    /// Prepare the evidence dir. The browser launches lazily on the first
    /// submission, so runs where every domain skips or falls back to email
    /// work without Chromium installed.
    pub fn new(evidence_dir: PathBuf, timeout_ms: u64) -> Result<Self> {
        std::fs::create_dir_all(&evidence_dir)
            .with_context(|| format!("failed to create {}", evidence_dir.display()))?;

        Ok(Self {
            browser: OnceCell::new(),
            evidence_dir,
            timeout_ms,
        })
    }

    /// The shared browser instance, launched on first use. A failed launch
    /// surfaces per attempt; the orchestrator turns it into an error record
    /// instead of aborting the batch.
    async fn browser(&self) -> Result<&Browser, AttemptError> {
        self.browser
            .get_or_try_init(launch_browser)
            .await
            .map_err(|e| AttemptError::Unexpected(format!("browser launch failed: {e:#}")))
    }

    fn evidence_path(&self, domain_slug: &str, stage: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.evidence_dir
            .join(format!("{domain_slug}_{stamp}_{stage}.png"))
    }

    async fn screenshot(&self, page: &Page, path: &PathBuf) -> Option<String> {
        let params = ScreenshotParams::builder().full_page(true).build();
        match page.save_screenshot(params, path).await {
            Ok(_) => Some(path.display().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "screenshot failed");
                None
            }
        }
    }
}

async fn launch_browser() -> Result<Browser> {
    let chrome_path = find_chromium()
        .context("Chromium not found; install Chrome/Chromium or set FORMSCOUT_CHROMIUM_PATH")?;

    let config = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .window_size(1280, 720)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch Chromium")?;

    // Drain CDP events for the lifetime of the browser.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let _ = event;
        }
    });

    Ok(browser)
}

#[async_trait]
impl FormInteractor for ChromiumInteractor {
    async fn submit(
        &self,
        form: &FormCandidate,
        profile: &TestProfile,
    ) -> Result<Submission, AttemptError> {
        let browser = self.browser().await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AttemptError::Transient {
                kind: TransientKind::Network,
                message: format!("failed to open page: {e}"),
            })?;

        let result = self.submit_on_page(&page, form, profile).await;
        let _ = page.close().await;
        result
    }
}

impl ChromiumInteractor {
    async fn submit_on_page(
        &self,
        page: &Page,
        form: &FormCandidate,
        profile: &TestProfile,
    ) -> Result<Submission, AttemptError> {
        let navigation = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            page.goto(form.page_url.as_str()),
        )
        .await;
        match navigation {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(AttemptError::Transient {
                    kind: TransientKind::Network,
                    message: format!("navigation failed: {e}"),
                })
            }
            Err(_) => {
                return Err(AttemptError::Transient {
                    kind: TransientKind::Timeout,
                    message: format!("navigation timed out after {}ms", self.timeout_ms),
                })
            }
        }
        let _ = page.wait_for_navigation().await;

        // Fill visible, known-role fields in document order.
        for field in &form.fields {
            if field.raw.hidden || field.raw.visually_hidden {
                continue;
            }
            let Some(value) = profile.value_for(field.role) else {
                continue;
            };
            let selector = field_selector(&field.raw.name_attr, &field.raw.id_attr);
            if selector.is_empty() {
                continue;
            }
            let element = page.find_element(selector.clone()).await.map_err(|e| {
                AttemptError::FillFailed(format!("could not locate {} ({selector}): {e}", field.role))
            })?;
            element.click().await.map_err(|e| {
                AttemptError::FillFailed(format!("could not focus {} ({selector}): {e}", field.role))
            })?;
            element.type_str(value).await.map_err(|e| {
                AttemptError::FillFailed(format!("could not fill {} ({selector}): {e}", field.role))
            })?;
            debug!(role = %field.role, selector, "field filled");
        }

        let domain_slug = slugify(&form.page_url);
        let before = self.evidence_path(&domain_slug, "before");
        let evidence_ref = self.screenshot(page, &before).await.unwrap_or_default();

        click_submit(page, form).await?;

        // Let the submission settle before capturing the after shot.
        let _ = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms.min(10_000)),
            page.wait_for_navigation(),
        )
        .await;
        let after = self.evidence_path(&domain_slug, "after");
        let _ = self.screenshot(page, &after).await;

        Ok(Submission { evidence_ref })
    }
}

async fn click_submit(page: &Page, form: &FormCandidate) -> Result<(), AttemptError> {
    if let Some(name) = &form.submit_name {
        let selector = format!("[name='{name}']");
        return match page.find_element(selector.clone()).await {
            Ok(el) => el.click().await.map(|_| ()).map_err(|e| {
                AttemptError::Unexpected(format!("submit click failed ({selector}): {e}"))
            }),
            Err(e) => Err(AttemptError::Unexpected(format!(
                "declared submit control missing ({selector}): {e}"
            ))),
        };
    }

    for selector in SUBMIT_SELECTORS {
        if let Ok(el) = page.find_element(selector.to_string()).await {
            if el.click().await.is_ok() {
                return Ok(());
            }
        }
    }
    Err(AttemptError::Unexpected(
        "no clickable submit control found".to_string(),
    ))
}

/// CSS selector for a field, preferring its name attribute.
fn field_selector(name_attr: &str, id_attr: &str) -> String {
    if !name_attr.is_empty() {
        format!("[name='{name_attr}']")
    } else if !id_attr.is_empty() {
        format!("#{id_attr}")
    } else {
        String::new()
    }
}

/// Filesystem-safe slug for evidence file names.
fn slugify(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());
    host.replace('.', "_")
}
