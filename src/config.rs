//! Run configuration and the injected test profile.
//!
//! Everything here is an explicit value handed to the components that need
//! it; nothing reads ambient globals after startup.

use crate::crawl::CrawlLimits;
use crate::orchestrate::RetryPolicy;
use std::path::PathBuf;

/// Default operator files, matching `formscout init`.
pub const DOMAINS_FILE: &str = "domains.csv";
pub const RESULTS_FILE: &str = "results.csv";
pub const SUPPRESSION_FILE: &str = "suppression_list.csv";
pub const EVIDENCE_DIR: &str = "evidence";

/// SMTP settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        let port = std::env::var("FORMSCOUT_SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        let host = std::env::var("FORMSCOUT_SMTP_HOST")
            .unwrap_or_else(|_| "smtp.gmail.com".to_string());
        Self {
            host,
            port,
            user: var("FORMSCOUT_SMTP_USER"),
            password: var("FORMSCOUT_SMTP_PASSWORD"),
            from: var("FORMSCOUT_FROM_EMAIL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty() && !self.password.is_empty()
    }

    /// Sender address; falls back to the SMTP user.
    pub fn from_addr(&self) -> &str {
        if self.from.is_empty() {
            &self.user
        } else {
            &self.from
        }
    }
}

/// The values filled into contact forms and fallback emails. Injected, not
/// global, so tests can vary it per run.
#[derive(Debug, Clone)]
pub struct TestProfile {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub phone: String,
    pub company: String,
}

impl Default for TestProfile {
    fn default() -> Self {
        Self {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            subject: "Test Contact Form Submission".to_string(),
            message: "This is an automated test message from the formscout audit tool."
                .to_string(),
            phone: "+1-555-123-4567".to_string(),
            company: "Test Company Inc.".to_string(),
        }
    }
}

impl TestProfile {
    /// Fill value for a field role; `Unknown` fields are left alone.
    pub fn value_for(&self, role: crate::classify::CanonicalRole) -> Option<&str> {
        use crate::classify::CanonicalRole::*;
        match role {
            Name => Some(&self.name),
            Email => Some(&self.email),
            Subject => Some(&self.subject),
            Message => Some(&self.message),
            Phone => Some(&self.phone),
            Company => Some(&self.company),
            Unknown => None,
        }
    }
}

/// Everything a batch run needs, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub limits: CrawlLimits,
    pub smtp: SmtpConfig,
    pub profile: TestProfile,
    pub retry: RetryPolicy,
    /// Concurrent domain workers.
    pub concurrency: usize,
    pub results_path: PathBuf,
    pub suppression_path: PathBuf,
    pub evidence_dir: PathBuf,
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self {
            limits: CrawlLimits::default(),
            smtp: SmtpConfig::from_env(),
            profile: TestProfile::default(),
            retry: RetryPolicy::default(),
            concurrency: 4,
            results_path: PathBuf::from(RESULTS_FILE),
            suppression_path: PathBuf::from(SUPPRESSION_FILE),
            evidence_dir: PathBuf::from(EVIDENCE_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CanonicalRole;

    #[test]
    fn profile_covers_every_known_role() {
        let profile = TestProfile::default();
        for role in [
            CanonicalRole::Name,
            CanonicalRole::Email,
            CanonicalRole::Subject,
            CanonicalRole::Message,
            CanonicalRole::Phone,
            CanonicalRole::Company,
        ] {
            assert!(profile.value_for(role).is_some(), "missing value for {role}");
        }
        assert!(profile.value_for(CanonicalRole::Unknown).is_none());
    }

    #[test]
    fn smtp_from_addr_falls_back_to_user() {
        let config = SmtpConfig {
            host: "h".to_string(),
            port: 587,
            user: "bot@example.com".to_string(),
            password: "p".to_string(),
            from: String::new(),
        };
        assert_eq!(config.from_addr(), "bot@example.com");
    }
}
