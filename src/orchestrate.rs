//! Submission orchestrator — executes the decided action and produces the
//! one terminal [`OutcomeRecord`] per domain per run.
//!
//! This is the only component permitted to cause an external side effect
//! (form submission or mail send) and the only one permitted to write a new
//! suppression entry. Retries are internal: regardless of retry count,
//! exactly one record is emitted, for the terminal attempt.
//!
//! State machine per domain:
//! `Pending → Attempting → {Succeeded | Retrying → Attempting | FailedTerminal}`

use crate::config::TestProfile;
use crate::decision::Decision;
use crate::extract::forms::FormCandidate;
use crate::interact::FormInteractor;
use crate::mail::MailTransport;
use crate::outcome::{Action, OutcomeRecord, ReasonCode, Status};
use crate::store::suppression::SuppressionStore;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Which transient failure occurred; decides the terminal reason code on
/// retry exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Network,
    Timeout,
    Smtp,
}

/// Failure taxonomy for external attempts. The orchestrator routes on the
/// variant, never on message text.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Retried with exponential backoff up to the retry ceiling.
    #[error("transient {kind:?} failure: {message}")]
    Transient {
        kind: TransientKind,
        message: String,
    },
    /// Never retried: the form rejected the submission client-side.
    /// Retrying an unchanged submission against unchanged validation rules
    /// cannot succeed.
    #[error("validation rejected: {0}")]
    ValidationRejected(String),
    /// Never retried: a field could not be filled.
    #[error("fill failed: {0}")]
    FillFailed(String),
    /// Never retried: permanent delivery failure; the address is added to
    /// the suppression list.
    #[error("hard bounce: {0}")]
    HardBounce(String),
    /// Anything that does not match a known class.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl TransientKind {
    fn reason_code(self) -> ReasonCode {
        match self {
            Self::Network => ReasonCode::NetworkError,
            Self::Timeout => ReasonCode::TimeoutError,
            Self::Smtp => ReasonCode::SmtpError,
        }
    }
}

/// Retry ceiling and backoff base for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base, 2×base, 4×base, …
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Pending,
    Attempting,
    Retrying,
    Succeeded,
    FailedTerminal,
}

/// Executes decisions against the external collaborators.
pub struct Orchestrator<'a> {
    interactor: &'a dyn FormInteractor,
    mailer: &'a dyn MailTransport,
    suppression: &'a SuppressionStore,
    profile: &'a TestProfile,
    retry: RetryPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        interactor: &'a dyn FormInteractor,
        mailer: &'a dyn MailTransport,
        suppression: &'a SuppressionStore,
        profile: &'a TestProfile,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            interactor,
            mailer,
            suppression,
            profile,
            retry,
        }
    }

    /// Run the decided action to its terminal state. Infallible by design:
    /// every failure class maps to a record, never an error that could
    /// abort the batch.
    pub async fn execute(
        &self,
        domain: &str,
        decision: Decision,
        forms: &[FormCandidate],
    ) -> OutcomeRecord {
        match decision {
            Decision::Skip { reason, details } => OutcomeRecord::new(
                domain,
                Action::FormSkip,
                Status::Skipped,
                reason,
                details,
                String::new(),
            ),
            Decision::SubmitForm { form_index } => match forms.get(form_index) {
                Some(form) => self.run_form(domain, form).await,
                // Defies the decision contract; do not crash the batch.
                None => OutcomeRecord::new(
                    domain,
                    Action::FormSubmit,
                    Status::Error,
                    ReasonCode::UnknownError,
                    format!("decision referenced missing candidate {form_index}"),
                    String::new(),
                ),
            },
            Decision::SendEmail { address } => self.run_email(domain, &address).await,
        }
    }

    async fn run_form(&self, domain: &str, form: &FormCandidate) -> OutcomeRecord {
        let mut state = AttemptState::Pending;
        debug!(domain, ?state, "form submission scheduled");
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            state = AttemptState::Attempting;
            debug!(domain, attempt, ?state, "submitting form");

            match self.interactor.submit(form, self.profile).await {
                Ok(submission) => {
                    state = AttemptState::Succeeded;
                    debug!(domain, ?state, "form submitted");
                    return OutcomeRecord::new(
                        domain,
                        Action::FormSubmit,
                        Status::Success,
                        ReasonCode::FormSubmittedSuccess,
                        format!("form at {}", form.page_url),
                        submission.evidence_ref,
                    );
                }
                Err(AttemptError::Transient { kind, message })
                    if attempt < self.retry.max_attempts =>
                {
                    state = AttemptState::Retrying;
                    let delay = self.retry.delay(attempt);
                    warn!(domain, attempt, ?state, ?kind, %message, ?delay, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Transient { kind, message }) => {
                    state = AttemptState::FailedTerminal;
                    debug!(domain, ?state, "retry ceiling reached");
                    return OutcomeRecord::new(
                        domain,
                        Action::FormSubmit,
                        Status::Failed,
                        kind.reason_code(),
                        format!("form at {}: {message}", form.page_url),
                        String::new(),
                    );
                }
                Err(AttemptError::ValidationRejected(message)) => {
                    return OutcomeRecord::new(
                        domain,
                        Action::FormSubmit,
                        Status::Failed,
                        ReasonCode::FormValidationFailed,
                        format!("form at {}: {message}", form.page_url),
                        String::new(),
                    );
                }
                Err(AttemptError::FillFailed(message)) => {
                    return OutcomeRecord::new(
                        domain,
                        Action::FormSubmit,
                        Status::Failed,
                        ReasonCode::FormFillError,
                        format!("form at {}: {message}", form.page_url),
                        String::new(),
                    );
                }
                Err(AttemptError::HardBounce(message) | AttemptError::Unexpected(message)) => {
                    return OutcomeRecord::new(
                        domain,
                        Action::FormSubmit,
                        Status::Error,
                        ReasonCode::UnknownError,
                        format!("form at {}: {message}", form.page_url),
                        String::new(),
                    );
                }
            }
        }
    }

    async fn run_email(&self, domain: &str, address: &str) -> OutcomeRecord {
        let subject = &self.profile.subject;
        let body = &self.profile.message;
        let mut state = AttemptState::Pending;
        debug!(domain, ?state, to = address, "email delivery scheduled");
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            state = AttemptState::Attempting;
            debug!(domain, attempt, ?state, to = address, "sending email");

            match self.mailer.send(address, subject, body).await {
                Ok(()) => {
                    state = AttemptState::Succeeded;
                    debug!(domain, ?state, "email sent");
                    return OutcomeRecord::new(
                        domain,
                        Action::Email,
                        Status::Success,
                        ReasonCode::EmailSent,
                        format!("to: {address}"),
                        String::new(),
                    );
                }
                Err(AttemptError::HardBounce(message)) => {
                    // The only path that writes suppression state.
                    if let Err(e) = self.suppression.append(address, "Hard bounce from SMTP") {
                        warn!(domain, address, error = %e, "failed to persist suppression entry");
                    }
                    return OutcomeRecord::new(
                        domain,
                        Action::Email,
                        Status::Failed,
                        ReasonCode::HardBounce,
                        format!("to: {address}: {message}"),
                        String::new(),
                    );
                }
                Err(AttemptError::Transient { kind, message })
                    if attempt < self.retry.max_attempts =>
                {
                    state = AttemptState::Retrying;
                    let delay = self.retry.delay(attempt);
                    warn!(domain, attempt, ?state, ?kind, %message, ?delay, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Transient { kind, message }) => {
                    state = AttemptState::FailedTerminal;
                    debug!(domain, ?state, "retry ceiling reached");
                    return OutcomeRecord::new(
                        domain,
                        Action::Email,
                        Status::Failed,
                        kind.reason_code(),
                        format!("to: {address}: {message}"),
                        String::new(),
                    );
                }
                Err(
                    AttemptError::ValidationRejected(message)
                    | AttemptError::FillFailed(message)
                    | AttemptError::Unexpected(message),
                ) => {
                    return OutcomeRecord::new(
                        domain,
                        Action::Email,
                        Status::Error,
                        ReasonCode::UnknownError,
                        format!("to: {address}: {message}"),
                        String::new(),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interact::Submission;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn store() -> (tempfile::TempDir, SuppressionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SuppressionStore::load(dir.path().join("suppression.csv")).unwrap();
        (dir, store)
    }

    struct ScriptedInteractor {
        calls: AtomicU32,
        script: Mutex<Vec<Result<Submission, AttemptError>>>,
    }

    impl ScriptedInteractor {
        fn new(script: Vec<Result<Submission, AttemptError>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl FormInteractor for ScriptedInteractor {
        async fn submit(
            &self,
            _form: &FormCandidate,
            _profile: &TestProfile,
        ) -> Result<Submission, AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }
    }

    struct ScriptedMailer {
        calls: AtomicU32,
        script: Mutex<Vec<Result<(), AttemptError>>>,
    }

    impl ScriptedMailer {
        fn new(script: Vec<Result<(), AttemptError>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl MailTransport for ScriptedMailer {
        async fn send(
            &self,
            _to: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<(), AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }
    }

    fn form() -> FormCandidate {
        crate::extract::forms::extract(
            "https://site.com/contact",
            r#"<form><input name="correo"></form>"#,
            &crate::lexicon::FieldLexicon::default(),
        )
        .remove(0)
        .into_candidate(crate::protection::ProtectionFlags::none())
    }

    fn transient(kind: TransientKind) -> AttemptError {
        AttemptError::Transient {
            kind,
            message: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_within_one_record() {
        let interactor = ScriptedInteractor::new(vec![
            Err(transient(TransientKind::Network)),
            Err(transient(TransientKind::Timeout)),
            Ok(Submission {
                evidence_ref: "evidence/x.png".to_string(),
            }),
        ]);
        let mailer = ScriptedMailer::new(vec![]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let forms = vec![form()];
        let record = orch
            .execute("site.com", Decision::SubmitForm { form_index: 0 }, &forms)
            .await;

        assert_eq!(interactor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.status, Status::Success);
        assert_eq!(record.reason_code, ReasonCode::FormSubmittedSuccess);
        assert_eq!(record.evidence_ref, "evidence/x.png");
    }

    #[tokio::test]
    async fn validation_rejection_is_never_retried() {
        let interactor = ScriptedInteractor::new(vec![Err(AttemptError::ValidationRejected(
            "required field".to_string(),
        ))]);
        let mailer = ScriptedMailer::new(vec![]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let forms = vec![form()];
        let record = orch
            .execute("site.com", Decision::SubmitForm { form_index: 0 }, &forms)
            .await;

        assert_eq!(interactor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.status, Status::Failed);
        assert_eq!(record.reason_code, ReasonCode::FormValidationFailed);
    }

    #[tokio::test]
    async fn retry_exhaustion_reports_the_transient_kind() {
        let interactor = ScriptedInteractor::new(vec![
            Err(transient(TransientKind::Timeout)),
            Err(transient(TransientKind::Timeout)),
            Err(transient(TransientKind::Timeout)),
        ]);
        let mailer = ScriptedMailer::new(vec![]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let forms = vec![form()];
        let record = orch
            .execute("site.com", Decision::SubmitForm { form_index: 0 }, &forms)
            .await;

        assert_eq!(interactor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.status, Status::Failed);
        assert_eq!(record.reason_code, ReasonCode::TimeoutError);
    }

    #[tokio::test]
    async fn hard_bounce_writes_suppression_and_reports() {
        let interactor = ScriptedInteractor::new(vec![]);
        let mailer = ScriptedMailer::new(vec![Err(AttemptError::HardBounce(
            "550 no such user".to_string(),
        ))]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let record = orch
            .execute(
                "site.com",
                Decision::SendEmail {
                    address: "bad@site.com".to_string(),
                },
                &[],
            )
            .await;

        assert_eq!(mailer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.reason_code, ReasonCode::HardBounce);
        assert!(suppression.contains("bad@site.com"));
        assert!(suppression.contains("BAD@site.com"));
    }

    #[tokio::test]
    async fn smtp_exhaustion_reports_smtp_error() {
        let interactor = ScriptedInteractor::new(vec![]);
        let mailer = ScriptedMailer::new(vec![
            Err(transient(TransientKind::Smtp)),
            Err(transient(TransientKind::Smtp)),
            Err(transient(TransientKind::Smtp)),
        ]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let record = orch
            .execute(
                "site.com",
                Decision::SendEmail {
                    address: "info@site.com".to_string(),
                },
                &[],
            )
            .await;

        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.reason_code, ReasonCode::SmtpError);
        assert!(!suppression.contains("info@site.com"));
    }

    #[tokio::test]
    async fn skip_decisions_are_recorded_as_is() {
        let interactor = ScriptedInteractor::new(vec![]);
        let mailer = ScriptedMailer::new(vec![]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let record = orch
            .execute(
                "site.com",
                Decision::Skip {
                    reason: ReasonCode::HasRecaptcha,
                    details: "form at https://site.com".to_string(),
                },
                &[],
            )
            .await;

        assert_eq!(interactor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(record.status, Status::Skipped);
        assert_eq!(record.reason_code, ReasonCode::HasRecaptcha);
    }

    #[tokio::test]
    async fn unexpected_failure_maps_to_unknown_error() {
        let interactor = ScriptedInteractor::new(vec![Err(AttemptError::Unexpected(
            "browser crashed".to_string(),
        ))]);
        let mailer = ScriptedMailer::new(vec![]);
        let (_dir, suppression) = store();
        let profile = TestProfile::default();
        let orch = Orchestrator::new(&interactor, &mailer, &suppression, &profile, test_policy());

        let forms = vec![form()];
        let record = orch
            .execute("site.com", Decision::SubmitForm { form_index: 0 }, &forms)
            .await;

        assert_eq!(record.status, Status::Error);
        assert_eq!(record.reason_code, ReasonCode::UnknownError);
    }
}
