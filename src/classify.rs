//! Field classifier — maps raw form fields to canonical roles.
//!
//! Classification is a total, pure function: malformed or unrecognized input
//! degrades to [`CanonicalRole::Unknown`], never an error. The `type`
//! attribute is an authoritative signal and overrides any textual match;
//! everything else goes through the injected [`FieldLexicon`] in a fixed
//! priority order, first match wins.

use crate::lexicon::FieldLexicon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The normalized semantic purpose of a form field, independent of its
/// literal markup name. A closed enumeration; `Unknown` is a valid, expected
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRole {
    Name,
    Email,
    Subject,
    Message,
    Phone,
    Company,
    Unknown,
}

impl CanonicalRole {
    /// Roles that identify the human on the other end. A hidden field
    /// carrying one of these is a honeypot signal, not a real input.
    pub fn is_contact_role(self) -> bool {
        matches!(self, Self::Name | Self::Email | Self::Phone)
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Subject => "subject",
            Self::Message => "message",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One form input as observed on a page. Immutable; created per parse and
/// discarded after classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawField {
    pub name_attr: String,
    pub id_attr: String,
    pub placeholder: String,
    pub label_text: String,
    /// The `type` attribute (or element name for `textarea`/`select`).
    pub field_type: String,
    pub required: bool,
    pub pattern: Option<String>,
    /// `hidden` attribute set or `type=hidden`.
    pub hidden: bool,
    /// Concealed by inline style (`display:none`, `visibility:hidden`,
    /// off-screen positioning, zero dimensions).
    pub visually_hidden: bool,
}

impl RawField {
    /// Best human-readable handle for evidence strings.
    pub fn display_name(&self) -> &str {
        if !self.name_attr.is_empty() {
            &self.name_attr
        } else if !self.id_attr.is_empty() {
            &self.id_attr
        } else {
            "<anonymous>"
        }
    }
}

/// Which signal resolved the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchBasis {
    /// An authoritative `type` attribute (`email` or `tel`).
    TypeAttr(String),
    /// A lexicon token found in the normalized textual attributes.
    Token(String),
    /// Nothing matched; the role is `Unknown`.
    NoMatch,
}

/// A raw field paired with its resolved role. Every `RawField` produces
/// exactly one of these; duplicate roles across fields are a decision-time
/// concern, not a classification error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedField {
    pub raw: RawField,
    pub role: CanonicalRole,
    pub basis: MatchBasis,
}

/// Classify one field against the lexicon.
pub fn classify(field: &RawField, lexicon: &FieldLexicon) -> ClassifiedField {
    // Type attributes are authoritative regardless of any lexicon match.
    let ty = field.field_type.to_ascii_lowercase();
    if ty == "email" {
        return classified(field, CanonicalRole::Email, MatchBasis::TypeAttr(ty));
    }
    if ty == "tel" {
        return classified(field, CanonicalRole::Phone, MatchBasis::TypeAttr(ty));
    }

    let haystack = normalize(&format!(
        "{} {} {} {}",
        field.name_attr, field.id_attr, field.placeholder, field.label_text
    ));

    for (role, tokens) in lexicon.iter() {
        for token in tokens {
            if !token.is_empty() && haystack.contains(token.as_str()) {
                return classified(field, role, MatchBasis::Token(token.clone()));
            }
        }
    }

    classified(field, CanonicalRole::Unknown, MatchBasis::NoMatch)
}

fn classified(field: &RawField, role: CanonicalRole, basis: MatchBasis) -> ClassifiedField {
    ClassifiedField {
        raw: field.clone(),
        role,
        basis,
    }
}

/// Normalize attribute text for lexicon matching: lowercase, strip
/// diacritics, fold `-`/`_`/whitespace runs into single spaces.
pub(crate) fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = true;
    for ch in text.chars() {
        for lc in ch.to_lowercase() {
            let folded = fold_diacritic(lc);
            if folded == '-' || folded == '_' || folded.is_whitespace() {
                if !prev_space {
                    out.push(' ');
                    prev_space = true;
                }
            } else {
                out.push(folded);
                prev_space = false;
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Fold common Latin diacritics to their base letter. Covers the scripts of
/// the maintained lexicon; anything else passes through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ß' => 's',
        other => other,
    }
}
