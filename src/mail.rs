//! SMTP fallback delivery via lettre.
//!
//! Failures are classified on lettre's error taxonomy, never on message
//! text: permanent SMTP rejections are hard bounces, transient rejections
//! retry upstream, and connection-level trouble counts as network noise.

use crate::config::SmtpConfig;
use crate::orchestrate::{AttemptError, TransientKind};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Sends the fallback email. One call is one attempt; retries live in the
/// orchestrator.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AttemptError>;
}

/// STARTTLS SMTP transport configured from the environment.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
}

impl SmtpMailer {
    /// Build the transport. Missing credentials are not an error here: the
    /// run may never take the email path. Sends fail cleanly instead.
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        if !config.is_configured() {
            return Ok(Self {
                transport: None,
                from: None,
            });
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config
            .from_addr()
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("invalid from address {:?}: {e}", config.from_addr()))?;

        Ok(Self {
            transport: Some(transport),
            from: Some(from),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AttemptError> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            return Err(AttemptError::Transient {
                kind: TransientKind::Smtp,
                message: "SMTP credentials not configured".to_string(),
            });
        };

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AttemptError::Unexpected(format!("invalid recipient {to}: {e}")))?;

        let message = Message::builder()
            .from(from.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AttemptError::Unexpected(format!("could not build message: {e}")))?;

        match transport.send(message).await {
            Ok(response) => {
                debug!(to, code = ?response.code(), "smtp accepted message");
                Ok(())
            }
            Err(e) => Err(classify_smtp_error(&e)),
        }
    }
}

/// Route lettre's SMTP error classes into the attempt taxonomy.
fn classify_smtp_error(error: &lettre::transport::smtp::Error) -> AttemptError {
    if error.is_permanent() {
        AttemptError::HardBounce(error.to_string())
    } else if error.is_transient() {
        AttemptError::Transient {
            kind: TransientKind::Smtp,
            message: error.to_string(),
        }
    } else {
        // Connection/TLS/IO trouble before any SMTP reply.
        AttemptError::Transient {
            kind: TransientKind::Network,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpConfig;

    fn unconfigured() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: String::new(),
        }
    }

    #[tokio::test]
    async fn unconfigured_mailer_fails_without_panicking() {
        let mailer = SmtpMailer::new(&unconfigured()).unwrap();
        let err = mailer
            .send("a@b.com", "subject", "body")
            .await
            .expect_err("send should fail");
        match err {
            AttemptError::Transient { kind, message } => {
                assert_eq!(kind, TransientKind::Smtp);
                assert!(message.contains("not configured"));
            }
            other => panic!("unexpected error class: {other:?}"),
        }
    }

    #[tokio::test]
    async fn configured_mailer_builds() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "bot@example.com".to_string(),
            password: "secret".to_string(),
            from: "bot@example.com".to_string(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
