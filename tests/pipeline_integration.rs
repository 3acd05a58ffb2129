//! End-to-end pipeline test: a hard bounce on one domain suppresses the
//! address for every later domain in the same run.

use async_trait::async_trait;
use formscout::config::{RunConfig, TestProfile};
use formscout::extract::forms::FormCandidate;
use formscout::interact::{FormInteractor, Submission};
use formscout::mail::MailTransport;
use formscout::orchestrate::AttemptError;
use formscout::outcome::{ReasonCode, Status};
use formscout::runner::Runner;
use formscout::store::domains::DomainTask;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoopInteractor;

#[async_trait]
impl FormInteractor for NoopInteractor {
    async fn submit(
        &self,
        _form: &FormCandidate,
        _profile: &TestProfile,
    ) -> Result<Submission, AttemptError> {
        Err(AttemptError::Unexpected("no forms in this test".to_string()))
    }
}

/// Hard-bounces every send and counts the attempts.
struct BouncingMailer {
    calls: AtomicU32,
}

#[async_trait]
impl MailTransport for BouncingMailer {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AttemptError::HardBounce(format!("550 no such user: {to}")))
    }
}

async fn formless_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>No contact options here.</p>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn hard_bounce_suppresses_the_address_for_later_domains() {
    let first = formless_site().await;
    let second = formless_site().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = RunConfig::from_env();
    config.limits.fetch_delay = Duration::ZERO;
    config.limits.max_pages = 1;
    config.concurrency = 1; // deterministic processing order
    config.results_path = dir.path().join("results.csv");
    config.suppression_path = dir.path().join("suppression_list.csv");

    let mailer = Arc::new(BouncingMailer {
        calls: AtomicU32::new(0),
    });
    let runner = Runner::new(config, Arc::new(NoopInteractor), mailer.clone()).unwrap();

    // Both domains target the same operator-supplied address.
    let tasks = vec![
        DomainTask {
            domain: first.uri(),
            target_email: Some("Ops@shared.com".to_string()),
        },
        DomainTask {
            domain: second.uri(),
            target_email: Some("ops@shared.com".to_string()),
        },
    ];
    let records = runner.process_all(tasks).await.unwrap();

    assert_eq!(records.len(), 2);
    let first_record = records
        .iter()
        .find(|r| r.domain == first.uri())
        .expect("missing record for first domain");
    let second_record = records
        .iter()
        .find(|r| r.domain == second.uri())
        .expect("missing record for second domain");

    // The bounce terminates the first attempt and is never retried.
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first_record.status, Status::Failed);
    assert_eq!(first_record.reason_code, ReasonCode::HardBounce);

    // The second domain never reaches the mailer.
    assert_eq!(second_record.status, Status::Skipped);
    assert_eq!(second_record.reason_code, ReasonCode::Suppressed);

    // Both terminal records landed in the log, after the header.
    let log = std::fs::read_to_string(dir.path().join("results.csv")).unwrap();
    assert_eq!(log.lines().count(), 3);
    assert!(log.contains("HARD_BOUNCE"));
    assert!(log.contains("SUPPRESSED"));

    // The suppression entry survives a reload.
    let persisted =
        std::fs::read_to_string(dir.path().join("suppression_list.csv")).unwrap();
    assert!(persisted.contains("ops@shared.com"));
    assert!(persisted.contains("Hard bounce from SMTP"));
}
