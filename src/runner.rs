//! Batch runner — drives the crawl → decide → execute pipeline across the
//! domain list with bounded concurrency.
//!
//! Each domain is processed by exactly one worker; there is no cross-domain
//! state beyond the shared suppression store and the result log. A worker
//! panic or crawl error is converted into an `UNKNOWN_ERROR` record so one
//! bad domain never takes down the batch.

use crate::config::RunConfig;
use crate::crawl::{http_client::HttpClient, Crawler};
use crate::decision::{self, DecisionInput};
use crate::interact::FormInteractor;
use crate::lexicon::FieldLexicon;
use crate::mail::MailTransport;
use crate::orchestrate::Orchestrator;
use crate::outcome::{Action, OutcomeRecord, ReasonCode, Status};
use crate::store::domains::DomainTask;
use crate::store::results::ResultsLog;
use crate::store::suppression::SuppressionStore;
use anyhow::Result;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared pipeline state. Cloning is cheap; clones share the suppression
/// store, result log, and cancellation flag.
#[derive(Clone)]
pub struct Runner {
    config: Arc<RunConfig>,
    http: Arc<HttpClient>,
    lexicon: Arc<FieldLexicon>,
    suppression: Arc<SuppressionStore>,
    results: Arc<ResultsLog>,
    interactor: Arc<dyn FormInteractor>,
    mailer: Arc<dyn MailTransport>,
    cancelled: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(
        config: RunConfig,
        interactor: Arc<dyn FormInteractor>,
        mailer: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let suppression = SuppressionStore::load(config.suppression_path.clone())?;
        let results = ResultsLog::new(config.results_path.clone());
        let http = HttpClient::new(config.limits.timeout_ms);
        Ok(Self {
            config: Arc::new(config),
            http: Arc::new(http),
            lexicon: Arc::new(FieldLexicon::default()),
            suppression: Arc::new(suppression),
            results: Arc::new(results),
            interactor,
            mailer,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop scheduling new domains. In-flight domains run to their terminal
    /// record; already-written records are kept.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn results(&self) -> &ResultsLog {
        &self.results
    }

    /// Process every task with at most `concurrency` domains in flight.
    /// Records are appended to the result log as they become terminal and
    /// also returned for summary reporting.
    pub async fn process_all(&self, tasks: Vec<DomainTask>) -> Result<Vec<OutcomeRecord>> {
        let concurrency = self.config.concurrency.max(1);
        info!(domains = tasks.len(), concurrency, "starting batch run");

        let mut stream = futures::stream::iter(tasks)
            .map(|task| {
                let worker = self.clone();
                async move {
                    let domain = task.domain.clone();
                    if worker.cancelled.load(Ordering::SeqCst) {
                        debug!(domain, "cancelled before start, skipping");
                        return None;
                    }

                    // Spawned so a panic in one domain worker is isolated
                    // and surfaces as a record instead of unwinding the
                    // batch.
                    let handle = tokio::spawn({
                        let worker = worker.clone();
                        async move { worker.run_domain(&task).await }
                    });
                    let record = match handle.await {
                        Ok(record) => record,
                        Err(e) => OutcomeRecord::new(
                            &domain,
                            Action::FormSkip,
                            Status::Error,
                            ReasonCode::UnknownError,
                            format!("domain worker panicked: {e}"),
                            String::new(),
                        ),
                    };
                    if let Err(e) = worker.results.append(&record) {
                        warn!(domain, error = %e, "failed to append outcome record");
                    }
                    Some(record)
                }
            })
            .buffer_unordered(concurrency);

        let mut records = Vec::new();
        while let Some(item) = stream.next().await {
            if let Some(record) = item {
                records.push(record);
            }
        }

        info!(processed = records.len(), "batch run finished");
        Ok(records)
    }

    /// Crawl, decide, execute. Always produces a terminal record.
    async fn run_domain(&self, task: &DomainTask) -> OutcomeRecord {
        let domain = task.domain.as_str();
        info!(domain, "auditing domain");

        let crawler = Crawler::new(&self.http, &self.lexicon, self.config.limits);
        let harvest = match crawler.crawl(domain).await {
            Ok(harvest) => harvest,
            Err(e) => {
                return OutcomeRecord::new(
                    domain,
                    Action::FormSkip,
                    Status::Error,
                    ReasonCode::UnknownError,
                    format!("crawl failed: {e:#}"),
                    String::new(),
                );
            }
        };

        // Snapshot taken after the crawl, so suppressions written earlier
        // in the run are visible to this decision.
        let suppressed = self.suppression.snapshot();
        let decision = decision::decide(&DecisionInput {
            domain,
            target_email: task.target_email.as_deref(),
            forms: &harvest.forms,
            emails: &harvest.emails,
            suppression: &suppressed,
        });
        debug!(domain, ?decision, "action decided");

        let orchestrator = Orchestrator::new(
            self.interactor.as_ref(),
            self.mailer.as_ref(),
            &self.suppression,
            &self.config.profile,
            self.config.retry,
        );
        orchestrator.execute(domain, decision, &harvest.forms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestProfile;
    use crate::extract::forms::FormCandidate;
    use crate::interact::Submission;
    use crate::orchestrate::AttemptError;
    use async_trait::async_trait;

    struct NoopInteractor;

    #[async_trait]
    impl FormInteractor for NoopInteractor {
        async fn submit(
            &self,
            _form: &FormCandidate,
            _profile: &TestProfile,
        ) -> Result<Submission, AttemptError> {
            Err(AttemptError::Unexpected("not under test".to_string()))
        }
    }

    struct NoopMailer;

    #[async_trait]
    impl MailTransport for NoopMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), AttemptError> {
            Err(AttemptError::Unexpected("not under test".to_string()))
        }
    }

    fn runner(dir: &std::path::Path) -> Runner {
        let mut config = RunConfig::from_env();
        config.results_path = dir.join("results.csv");
        config.suppression_path = dir.join("suppression_list.csv");
        Runner::new(config, Arc::new(NoopInteractor), Arc::new(NoopMailer)).unwrap()
    }

    #[tokio::test]
    async fn cancelled_runner_schedules_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        runner.cancel();

        let records = runner
            .process_all(vec![DomainTask::new("site.com")])
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(!dir.path().join("results.csv").exists());
    }

    #[tokio::test]
    async fn unreachable_domain_yields_an_error_record() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());

        // Invalid as a URL, so the crawl fails before any network I/O.
        let records = runner
            .process_all(vec![DomainTask::new("not a domain")])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Error);
        assert_eq!(records[0].reason_code, ReasonCode::UnknownError);
        assert!(dir.path().join("results.csv").exists());
    }
}
