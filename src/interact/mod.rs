//! Browser-driven form interaction — the seam to the automation engine.

pub mod chromium;

use crate::config::TestProfile;
use crate::extract::forms::FormCandidate;
use crate::orchestrate::AttemptError;
use async_trait::async_trait;

/// Evidence of a completed submission attempt.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Opaque evidence reference (screenshot path); not interpreted here.
    pub evidence_ref: String,
}

/// Fills a form candidate with profile values and submits it.
///
/// Implementations own the browser mechanics; the orchestrator owns
/// retries, so a single call is a single attempt.
#[async_trait]
pub trait FormInteractor: Send + Sync {
    async fn submit(
        &self,
        form: &FormCandidate,
        profile: &TestProfile,
    ) -> Result<Submission, AttemptError>;
}
