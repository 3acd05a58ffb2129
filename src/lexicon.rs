//! Field lexicon — canonical role to known raw-name synonyms.
//!
//! Pure data. The lexicon is an explicit, immutable value injected into the
//! classifier at construction, so parallel test runs can use different
//! lexicons without touching global state.

use crate::classify::{normalize, CanonicalRole};

/// Maps each canonical role to the raw-name tokens known to signal it.
///
/// Entry order is the classification priority order: `email > phone > name >
/// subject > company > message`. Email and phone patterns are the most
/// specific signals and are checked first; ambiguous tokens like "contact"
/// would otherwise suggest both name and message.
#[derive(Debug, Clone)]
pub struct FieldLexicon {
    entries: Vec<(CanonicalRole, Vec<String>)>,
}

impl FieldLexicon {
    /// Build a lexicon from role/token pairs. Tokens are normalized the same
    /// way field attributes are, so matches compare like with like.
    pub fn new(entries: Vec<(CanonicalRole, Vec<String>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(role, tokens)| {
                let tokens = tokens.iter().map(|t| normalize(t)).collect();
                (role, tokens)
            })
            .collect();
        Self { entries }
    }

    /// Roles and their tokens, in classification priority order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalRole, &[String])> {
        self.entries.iter().map(|(role, tokens)| (*role, tokens.as_slice()))
    }
}

impl Default for FieldLexicon {
    fn default() -> Self {
        let owned = |tokens: &[&str]| tokens.iter().map(|t| t.to_string()).collect();
        Self::new(vec![
            (
                CanonicalRole::Email,
                owned(&[
                    "email",
                    "correo",
                    "e-mail",
                    "mail",
                    "email_address",
                    "your_email",
                    "courriel",
                ]),
            ),
            (
                CanonicalRole::Phone,
                owned(&[
                    "phone",
                    "telefono",
                    "tel",
                    "telephone",
                    "mobile",
                    "cell",
                    "handy",
                ]),
            ),
            (
                CanonicalRole::Name,
                owned(&[
                    "name",
                    "nombre",
                    "fullname",
                    "full_name",
                    "your_name",
                    "contact_name",
                    "nom",
                ]),
            ),
            (
                CanonicalRole::Subject,
                owned(&["subject", "asunto", "topic", "title", "betreff", "sujet"]),
            ),
            (
                CanonicalRole::Company,
                owned(&[
                    "company",
                    "empresa",
                    "organization",
                    "organisation",
                    "business",
                    "firma",
                    "entreprise",
                ]),
            ),
            (
                CanonicalRole::Message,
                owned(&[
                    "message",
                    "mensaje",
                    "comments",
                    "comment",
                    "body",
                    "content",
                    "your_message",
                    "nachricht",
                    "inquiry",
                    "enquiry",
                ]),
            ),
        ])
    }
}
