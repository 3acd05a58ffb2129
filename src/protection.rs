//! CAPTCHA and honeypot detection for form candidates.
//!
//! Detection is total: absence of evidence means a flag is `false`, never
//! "unknown". Flags are derived fresh per crawl and never cached across
//! runs, since page structure may change.

use crate::extract::forms::ExtractedForm;

/// Known script/iframe/DOM markers per CAPTCHA provider. Matched
/// case-insensitively against markup.
const RECAPTCHA_MARKERS: &[&str] = &["g-recaptcha", "recaptcha"];
const HCAPTCHA_MARKERS: &[&str] = &["h-captcha", "hcaptcha"];
const GENERIC_CAPTCHA_MARKERS: &[&str] = &["data-sitekey", "captcha"];

/// Field names that only exist to bait automated submitters. No canonical
/// role expects them on a contact form.
const HONEYPOT_BAIT_TOKENS: &[&str] = &["url", "website", "homepage", "fax"];

/// Protection evidence per mechanism; `None` means not detected. The
/// evidence string is the marker or field that matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionFlags {
    pub recaptcha: Option<String>,
    pub hcaptcha: Option<String>,
    pub generic_captcha: Option<String>,
    pub honeypot: Option<String>,
}

impl ProtectionFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_recaptcha(&self) -> bool {
        self.recaptcha.is_some()
    }

    pub fn has_hcaptcha(&self) -> bool {
        self.hcaptcha.is_some()
    }

    pub fn any_captcha(&self) -> bool {
        self.recaptcha.is_some() || self.hcaptcha.is_some() || self.generic_captcha.is_some()
    }

    pub fn has_honeypot(&self) -> bool {
        self.honeypot.is_some()
    }

    /// Evidence of whichever CAPTCHA flag is set, most specific first.
    pub fn captcha_evidence(&self) -> Option<&str> {
        self.recaptcha
            .as_deref()
            .or(self.hcaptcha.as_deref())
            .or(self.generic_captcha.as_deref())
    }
}

/// Inspect a form candidate for CAPTCHA and honeypot signatures.
///
/// Provider signatures are scoped to the form's own markup first and fall
/// back to the whole page, so a page-level reCAPTCHA badge still flags every
/// candidate on that page. The generic flag is only raised when neither
/// specific provider matched.
pub fn detect(form: &ExtractedForm, page_markup: &str) -> ProtectionFlags {
    let form_lower = form.markup.to_lowercase();
    let page_lower = page_markup.to_lowercase();

    let mut flags = ProtectionFlags::none();
    flags.recaptcha = find_marker(&form_lower, RECAPTCHA_MARKERS)
        .or_else(|| find_marker(&page_lower, RECAPTCHA_MARKERS));
    flags.hcaptcha = find_marker(&form_lower, HCAPTCHA_MARKERS)
        .or_else(|| find_marker(&page_lower, HCAPTCHA_MARKERS));
    if flags.recaptcha.is_none() && flags.hcaptcha.is_none() {
        flags.generic_captcha = find_marker(&form_lower, GENERIC_CAPTCHA_MARKERS)
            .or_else(|| find_marker(&page_lower, GENERIC_CAPTCHA_MARKERS));
    }
    flags.honeypot = detect_honeypot(form);
    flags
}

fn find_marker(haystack: &str, markers: &[&str]) -> Option<String> {
    markers
        .iter()
        .find(|m| marker_at_boundary(haystack, m))
        .map(|m| m.to_string())
}

/// A marker only counts when it starts at a token boundary, so
/// `with-captcha` is not an `h-captcha` signature.
fn marker_at_boundary(haystack: &str, marker: &str) -> bool {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(marker) {
        let at = from + pos;
        let bounded = haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_ascii_alphanumeric());
        if bounded {
            return true;
        }
        from = at + 1;
    }
    false
}

/// A form is honeypot-flagged when it contains at least one trap field:
/// a hidden field carrying a contact role (a real human-facing input would
/// never be hidden), any visually concealed field, or a bait-token name.
/// Hidden fields with `Unknown` roles (CSRF tokens and the like) are
/// legitimate and do not flag.
fn detect_honeypot(form: &ExtractedForm) -> Option<String> {
    for field in &form.fields {
        let raw = &field.raw;
        if raw.hidden && field.role.is_contact_role() {
            return Some(format!(
                "hidden field '{}' carries role {}",
                raw.display_name(),
                field.role
            ));
        }
        if raw.visually_hidden {
            return Some(format!(
                "visually concealed field '{}'",
                raw.display_name()
            ));
        }
        let words = crate::classify::normalize(&format!("{} {}", raw.name_attr, raw.id_attr));
        for bait in HONEYPOT_BAIT_TOKENS {
            if words.split(' ').any(|w| w == *bait) {
                return Some(format!(
                    "bait token '{}' in field '{}'",
                    bait,
                    raw.display_name()
                ));
            }
        }
    }
    None
}
