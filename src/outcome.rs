//! Outcome records and the closed reason-code vocabulary.
//!
//! Reason codes are a stable, machine-readable vocabulary — downstream
//! consumers key on the serialized strings, so variants must never be
//! renamed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal action taken for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "FORM_SUBMIT")]
    FormSubmit,
    #[serde(rename = "EMAIL")]
    Email,
    #[serde(rename = "FORM_SKIP")]
    FormSkip,
}

/// Terminal status of the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "ERROR")]
    Error,
}

/// Why the outcome is what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    #[serde(rename = "FORM_SUBMITTED_SUCCESS")]
    FormSubmittedSuccess,
    #[serde(rename = "EMAIL_SENT")]
    EmailSent,
    #[serde(rename = "HAS_RECAPTCHA")]
    HasRecaptcha,
    #[serde(rename = "HAS_HCAPTCHA")]
    HasHcaptcha,
    #[serde(rename = "HONEYPOT_DETECTED")]
    HoneypotDetected,
    #[serde(rename = "NO_FORM_FOUND")]
    NoFormFound,
    #[serde(rename = "HARD_BOUNCE")]
    HardBounce,
    #[serde(rename = "FORM_FILL_ERROR")]
    FormFillError,
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError,
    #[serde(rename = "TIMEOUT_ERROR")]
    TimeoutError,
    #[serde(rename = "SMTP_ERROR")]
    SmtpError,
    #[serde(rename = "UNKNOWN_ERROR")]
    UnknownError,
    #[serde(rename = "SUPPRESSED")]
    Suppressed,
    #[serde(rename = "FORM_VALIDATION_FAILED")]
    FormValidationFailed,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormSubmittedSuccess => "FORM_SUBMITTED_SUCCESS",
            Self::EmailSent => "EMAIL_SENT",
            Self::HasRecaptcha => "HAS_RECAPTCHA",
            Self::HasHcaptcha => "HAS_HCAPTCHA",
            Self::HoneypotDetected => "HONEYPOT_DETECTED",
            Self::NoFormFound => "NO_FORM_FOUND",
            Self::HardBounce => "HARD_BOUNCE",
            Self::FormFillError => "FORM_FILL_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::SmtpError => "SMTP_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Suppressed => "SUPPRESSED",
            Self::FormValidationFailed => "FORM_VALIDATION_FAILED",
        }
    }

    /// Human-readable description, distinct from the stable code.
    pub fn description(self) -> &'static str {
        match self {
            Self::FormSubmittedSuccess => "Contact form submitted successfully",
            Self::EmailSent => "Email sent via SMTP fallback",
            Self::HasRecaptcha => "reCAPTCHA detected, submission skipped",
            Self::HasHcaptcha => "hCAPTCHA detected, submission skipped",
            Self::HoneypotDetected => "Honeypot detected, submission skipped",
            Self::NoFormFound => "No contact form or email found",
            Self::HardBounce => "Permanent bounce, address added to suppression list",
            Self::FormFillError => "Could not fill form fields",
            Self::NetworkError => "Network error reaching the site",
            Self::TimeoutError => "Request timed out",
            Self::SmtpError => "SMTP delivery failed",
            Self::UnknownError => "Unknown error",
            Self::Suppressed => "Address is on the suppression list",
            Self::FormValidationFailed => "Form rejected the submission client-side",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one terminal record per domain per run. Created once by the
/// orchestrator as the final step, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: String,
    pub domain: String,
    pub action: Action,
    pub status: Status,
    pub reason_code: ReasonCode,
    pub reason_description: String,
    pub details: String,
    pub evidence_ref: String,
}

impl OutcomeRecord {
    pub fn new(
        domain: &str,
        action: Action,
        status: Status,
        reason_code: ReasonCode,
        details: String,
        evidence_ref: String,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            domain: domain.to_string(),
            action,
            status,
            reason_code,
            reason_description: reason_code.description().to_string(),
            details,
            evidence_ref,
        }
    }
}
