//! Action decision engine — exactly one action and reason per domain.
//!
//! A pure function over already-computed facts; no network, no I/O. The
//! precedence is a total order modeled as an ordered list of
//! predicate→decision rules evaluated in a single pass, so adding a rule is
//! a localized change:
//!
//! 1. best-available email is suppressed → skip, `SUPPRESSED`
//! 2. a clean, submittable form exists → submit the first one
//! 3. a candidate is CAPTCHA-flagged → skip, most specific provider code
//! 4. a candidate is honeypot-flagged → skip, `HONEYPOT_DETECTED`
//! 5. an email candidate exists → send email
//! 6. otherwise → skip, `NO_FORM_FOUND`
//!
//! Suppression overrides everything, even a clean form: the policy goal is
//! "never contact a suppressed address by any channel".

use crate::extract::emails::EmailCandidate;
use crate::extract::forms::FormCandidate;
use crate::outcome::ReasonCode;
use std::collections::HashSet;
use tracing::debug;

/// Everything the engine is allowed to look at.
pub struct DecisionInput<'a> {
    pub domain: &'a str,
    /// Operator-supplied target address from the domain list, if any.
    pub target_email: Option<&'a str>,
    /// Candidates in crawl order, fields in document order.
    pub forms: &'a [FormCandidate],
    /// Candidates in crawl order, deduplicated.
    pub emails: &'a [EmailCandidate],
    /// Normalized (lowercase) suppressed addresses.
    pub suppression: &'a HashSet<String>,
}

impl DecisionInput<'_> {
    /// The domain's best-available contact address: the operator-supplied
    /// target wins, else the first extracted candidate in crawl order.
    pub fn best_email(&self) -> Option<String> {
        self.target_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .or_else(|| self.emails.first().map(|e| e.address.clone()))
    }
}

/// The selected action. Skips carry the evidence that justified them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Submit `forms[form_index]` via the interaction engine.
    SubmitForm { form_index: usize },
    /// Send the fallback email to this address.
    SendEmail { address: String },
    /// No attempt; record the reason as-is.
    Skip { reason: ReasonCode, details: String },
}

type Rule = fn(&DecisionInput) -> Option<Decision>;

/// Precedence order. First applicable rule wins; later rules are
/// unreachable once an earlier one fires.
const RULES: &[(&str, Rule)] = &[
    ("suppressed", rule_suppressed),
    ("clean-form", rule_clean_form),
    ("captcha", rule_captcha),
    ("honeypot", rule_honeypot),
    ("email-fallback", rule_email_fallback),
];

/// Select exactly one action for the domain. Deterministic given identical
/// crawl input, so outcomes are reproducible for audit.
pub fn decide(input: &DecisionInput) -> Decision {
    for (name, rule) in RULES {
        if let Some(decision) = rule(input) {
            debug!(domain = input.domain, rule = name, "decision rule fired");
            return decision;
        }
    }
    Decision::Skip {
        reason: ReasonCode::NoFormFound,
        details: "no contact form or email found".to_string(),
    }
}

fn rule_suppressed(input: &DecisionInput) -> Option<Decision> {
    let best = input.best_email()?;
    if input.suppression.contains(&best.to_lowercase()) {
        return Some(Decision::Skip {
            reason: ReasonCode::Suppressed,
            details: format!("address {best} is on the suppression list"),
        });
    }
    None
}

fn rule_clean_form(input: &DecisionInput) -> Option<Decision> {
    input
        .forms
        .iter()
        .position(|f| f.is_clean() && f.is_submittable())
        .map(|form_index| Decision::SubmitForm { form_index })
}

fn rule_captcha(input: &DecisionInput) -> Option<Decision> {
    let flagged = |pick: fn(&FormCandidate) -> bool| input.forms.iter().find(|f| pick(f));

    // Most specific flag wins across all candidates on the page set. A
    // generic-only CAPTCHA is reported under the reCAPTCHA code (closed
    // vocabulary; the matched evidence lands in details).
    if let Some(form) = flagged(|f| f.protection.has_recaptcha()) {
        return Some(skip_captcha(ReasonCode::HasRecaptcha, form));
    }
    if let Some(form) = flagged(|f| f.protection.has_hcaptcha()) {
        return Some(skip_captcha(ReasonCode::HasHcaptcha, form));
    }
    if let Some(form) = flagged(|f| f.protection.generic_captcha.is_some()) {
        return Some(skip_captcha(ReasonCode::HasRecaptcha, form));
    }
    None
}

fn skip_captcha(reason: ReasonCode, form: &FormCandidate) -> Decision {
    let evidence = form.protection.captcha_evidence().unwrap_or("captcha");
    Decision::Skip {
        reason,
        details: format!("form at {} matched '{evidence}'", form.page_url),
    }
}

fn rule_honeypot(input: &DecisionInput) -> Option<Decision> {
    input
        .forms
        .iter()
        .find(|f| f.protection.has_honeypot())
        .map(|form| {
            let evidence = form.protection.honeypot.as_deref().unwrap_or("honeypot");
            Decision::Skip {
                reason: ReasonCode::HoneypotDetected,
                details: format!("form at {}: {evidence}", form.page_url),
            }
        })
}

fn rule_email_fallback(input: &DecisionInput) -> Option<Decision> {
    input
        .best_email()
        .map(|address| Decision::SendEmail { address })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::forms::extract;
    use crate::lexicon::FieldLexicon;
    use crate::protection;

    const PAGE: &str = "https://site.com/contact";

    fn candidates(page_html: &str) -> Vec<FormCandidate> {
        extract(PAGE, page_html, &FieldLexicon::default())
            .into_iter()
            .map(|ex| {
                let flags = protection::detect(&ex, page_html);
                ex.into_candidate(flags)
            })
            .collect()
    }

    fn email(address: &str) -> EmailCandidate {
        EmailCandidate {
            address: address.to_string(),
            source_url: PAGE.to_string(),
            method: crate::extract::emails::ExtractionMethod::MailtoLink,
        }
    }

    fn input<'a>(
        forms: &'a [FormCandidate],
        emails: &'a [EmailCandidate],
        suppression: &'a HashSet<String>,
    ) -> DecisionInput<'a> {
        DecisionInput {
            domain: "site.com",
            target_email: None,
            forms,
            emails,
            suppression,
        }
    }

    #[test]
    fn clean_spanish_form_is_submitted() {
        let forms = candidates(
            r#"<form><input name="nombre"><input name="correo"><textarea name="mensaje"></textarea></form>"#,
        );
        let decision = decide(&input(&forms, &[], &HashSet::new()));
        assert_eq!(decision, Decision::SubmitForm { form_index: 0 });
    }

    #[test]
    fn zero_border_width_styling_is_not_a_honeypot() {
        let forms = candidates(
            r#"<form>
                 <input name="nombre" style="border-width: 0; padding: 4px">
                 <input name="correo">
                 <textarea name="mensaje"></textarea>
               </form>"#,
        );
        assert!(!forms[0].fields[0].raw.visually_hidden);
        let decision = decide(&input(&forms, &[], &HashSet::new()));
        assert_eq!(decision, Decision::SubmitForm { form_index: 0 });
    }

    #[test]
    fn clean_form_wins_even_when_other_candidates_are_protected() {
        let forms = candidates(
            r#"
            <form><input name="correo"><div class="g-recaptcha"></div></form>
            <form><input name="correo"><textarea name="mensaje"></textarea></form>
            "#,
        );
        // Page-level scoping flags both candidates here, so build the clean
        // one from an unprotected page instead.
        let mut forms = forms;
        forms[1] = candidates(r#"<form id="b"><input name="correo"></form>"#).remove(0);
        let decision = decide(&input(&forms, &[], &HashSet::new()));
        assert_eq!(decision, Decision::SubmitForm { form_index: 1 });
    }

    #[test]
    fn recaptcha_skip_when_no_clean_candidate() {
        let forms = candidates(
            r#"<form><input name="correo"><iframe src="https://google.com/recaptcha/api2"></iframe></form>"#,
        );
        match decide(&input(&forms, &[], &HashSet::new())) {
            Decision::Skip { reason, details } => {
                assert_eq!(reason, ReasonCode::HasRecaptcha);
                assert!(details.contains("recaptcha"));
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn captcha_beats_honeypot_across_candidates() {
        let mut forms = candidates(
            r#"<form><input name="website"><input name="correo"></form>"#,
        );
        forms.extend(candidates(
            r#"<form><input name="correo"><div class="h-captcha"></div></form>"#,
        ));
        match decide(&input(&forms, &[], &HashSet::new())) {
            Decision::Skip { reason, .. } => assert_eq!(reason, ReasonCode::HasHcaptcha),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn generic_captcha_reports_recaptcha_code_with_evidence() {
        let forms = candidates(r#"<form class="captcha-guard"><input name="correo"></form>"#);
        match decide(&input(&forms, &[], &HashSet::new())) {
            Decision::Skip { reason, details } => {
                assert_eq!(reason, ReasonCode::HasRecaptcha);
                assert!(details.contains("captcha"));
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn honeypot_skip_when_only_flag() {
        let forms = candidates(r#"<form><input name="website"><input name="correo"></form>"#);
        match decide(&input(&forms, &[], &HashSet::new())) {
            Decision::Skip { reason, .. } => assert_eq!(reason, ReasonCode::HoneypotDetected),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn email_fallback_when_no_form() {
        let emails = vec![email("info@site.com")];
        let decision = decide(&input(&[], &emails, &HashSet::new()));
        assert_eq!(
            decision,
            Decision::SendEmail {
                address: "info@site.com".to_string()
            }
        );
    }

    #[test]
    fn suppression_overrides_a_clean_form() {
        let forms = candidates(
            r#"<form><input name="nombre"><input name="correo"><textarea name="mensaje"></textarea></form>"#,
        );
        let emails = vec![email("info@site.com")];
        let suppression: HashSet<String> = ["info@site.com".to_string()].into();
        match decide(&input(&forms, &emails, &suppression)) {
            Decision::Skip { reason, .. } => assert_eq!(reason, ReasonCode::Suppressed),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn operator_target_email_wins_over_extracted() {
        let emails = vec![email("found@site.com")];
        let suppression = HashSet::new();
        let input = DecisionInput {
            domain: "site.com",
            target_email: Some("ops@site.com"),
            forms: &[],
            emails: &emails,
            suppression: &suppression,
        };
        assert_eq!(
            decide(&input),
            Decision::SendEmail {
                address: "ops@site.com".to_string()
            }
        );
    }

    #[test]
    fn suppression_matching_is_case_insensitive() {
        let emails = vec![email("Info@site.com")];
        let suppression: HashSet<String> = ["info@site.com".to_string()].into();
        match decide(&input(&[], &emails, &suppression)) {
            Decision::Skip { reason, .. } => assert_eq!(reason, ReasonCode::Suppressed),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn nothing_found_is_no_form_found() {
        match decide(&input(&[], &[], &HashSet::new())) {
            Decision::Skip { reason, .. } => assert_eq!(reason, ReasonCode::NoFormFound),
            other => panic!("expected skip, got {other:?}"),
        }
    }
}
