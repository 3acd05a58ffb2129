//! Form candidate extraction from parsed HTML.
//!
//! Walks every `<form>` element in document order, lifts its inputs into
//! [`RawField`]s (hidden fields included, they matter for protection
//! analysis), classifies each field, and resolves the submission endpoint
//! against the page URL. Candidates are emitted even when every field is
//! `Unknown` — judging usability is the decision engine's job, not the
//! extractor's.

use crate::classify::{classify, ClassifiedField, RawField};
use crate::lexicon::FieldLexicon;
use crate::protection::ProtectionFlags;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Input types that are controls, not data fields.
const CONTROL_TYPES: &[&str] = &["submit", "button", "image", "reset"];

/// A form as lifted off the page, before protection analysis.
#[derive(Debug, Clone)]
pub struct ExtractedForm {
    pub page_url: String,
    /// Submission endpoint, resolved to an absolute URL.
    pub action: String,
    /// HTTP method, uppercased; defaults to `GET`.
    pub method: String,
    /// Classified fields in document order.
    pub fields: Vec<ClassifiedField>,
    /// Name or id of the submit control, when one was declared.
    pub submit_name: Option<String>,
    /// Raw markup of the form element, kept for protection analysis.
    pub markup: String,
}

impl ExtractedForm {
    pub fn into_candidate(self, protection: ProtectionFlags) -> FormCandidate {
        FormCandidate {
            page_url: self.page_url,
            action: self.action,
            method: self.method,
            fields: self.fields,
            submit_name: self.submit_name,
            protection,
        }
    }
}

/// A fully analyzed contact-form candidate. Immutable after extraction.
#[derive(Debug, Clone)]
pub struct FormCandidate {
    pub page_url: String,
    pub action: String,
    pub method: String,
    pub fields: Vec<ClassifiedField>,
    pub submit_name: Option<String>,
    pub protection: ProtectionFlags,
}

impl FormCandidate {
    /// A candidate with no visible known-role field is not a valid
    /// submission target.
    pub fn is_submittable(&self) -> bool {
        self.fields
            .iter()
            .any(|f| !f.raw.hidden && !f.raw.visually_hidden && f.role.is_known())
    }

    pub fn is_clean(&self) -> bool {
        !self.protection.any_captcha() && !self.protection.has_honeypot()
    }
}

/// Extract every form on the page, in document order.
pub fn extract(page_url: &str, html: &str, lexicon: &FieldLexicon) -> Vec<ExtractedForm> {
    let document = Html::parse_document(html);
    let Ok(form_sel) = Selector::parse("form") else {
        return Vec::new();
    };
    let Ok(field_sel) = Selector::parse("input, textarea, select") else {
        return Vec::new();
    };

    let labels = label_texts(&document);

    let mut forms = Vec::new();
    for form_el in document.select(&form_sel) {
        let method = form_el
            .value()
            .attr("method")
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let action = resolve_endpoint(page_url, form_el.value().attr("action"));

        let mut fields = Vec::new();
        let mut submit_name = None;
        for input_el in form_el.select(&field_sel) {
            let field_type = field_type_of(&input_el);
            let name_attr = attr(&input_el, "name");
            let id_attr = attr(&input_el, "id");

            if CONTROL_TYPES.contains(&field_type.as_str()) {
                if field_type == "submit" && submit_name.is_none() {
                    let handle = if !name_attr.is_empty() { name_attr } else { id_attr };
                    if !handle.is_empty() {
                        submit_name = Some(handle);
                    }
                }
                continue;
            }

            let style = attr(&input_el, "style");
            let label_text = labels.get(&id_attr).cloned().unwrap_or_default();
            let raw = RawField {
                placeholder: attr(&input_el, "placeholder"),
                label_text,
                required: input_el.value().attr("required").is_some(),
                pattern: input_el.value().attr("pattern").map(str::to_string),
                hidden: field_type == "hidden" || input_el.value().attr("hidden").is_some(),
                visually_hidden: style_conceals(&style),
                field_type,
                name_attr,
                id_attr,
            };
            fields.push(classify(&raw, lexicon));
        }

        forms.push(ExtractedForm {
            page_url: page_url.to_string(),
            action,
            method,
            fields,
            submit_name,
            markup: form_el.html(),
        });
    }
    forms
}

fn attr(el: &ElementRef, name: &str) -> String {
    el.value().attr(name).unwrap_or("").trim().to_string()
}

/// The `type` attribute for inputs; the element name for textarea/select.
fn field_type_of(el: &ElementRef) -> String {
    match el.value().name() {
        "input" => el
            .value()
            .attr("type")
            .unwrap_or("text")
            .to_ascii_lowercase(),
        other => other.to_string(),
    }
}

/// Map of `label[for]` targets to their visible text.
fn label_texts(document: &Html) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Ok(sel) = Selector::parse("label[for]") {
        for label in document.select(&sel) {
            if let Some(target) = label.value().attr("for") {
                let text: String = label.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    map.entry(target.to_string()).or_insert(text);
                }
            }
        }
    }
    map
}

/// Resolve the form action against the page URL. A missing or empty action
/// submits back to the page itself.
fn resolve_endpoint(page_url: &str, action: Option<&str>) -> String {
    let action = action.unwrap_or("").trim();
    if action.is_empty() {
        return page_url.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(action)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => action.to_string(),
    }
}

/// Inline-style declarations that conceal a field. Matched per property so
/// `border-width: 0` is not mistaken for `width: 0`.
fn style_conceals(style: &str) -> bool {
    let compact: String = style
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact.split(';').any(|decl| {
        let Some((prop, value)) = decl.split_once(':') else {
            return false;
        };
        match prop {
            "display" => value == "none",
            "visibility" => value == "hidden",
            // Off-screen positioning.
            "left" | "top" => value.starts_with('-'),
            "width" | "height" => matches!(value, "0" | "0px" | "0em" | "0rem" | "0%"),
            _ => false,
        }
    })
}
