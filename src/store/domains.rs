//! The operator-maintained domain list.
//!
//! Format: `domain,email` per row, the email column optional; `#` lines are
//! comments.

use anyhow::{Context, Result};
use std::path::Path;

/// One domain to audit, with an optional operator-supplied target address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTask {
    pub domain: String,
    pub target_email: Option<String>,
}

impl DomainTask {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            target_email: None,
        }
    }
}

/// Load the domain list. A missing file is an error; `formscout init`
/// creates a starter file.
pub fn load(path: &Path) -> Result<Vec<DomainTask>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open domain list {}", path.display()))?;

    let mut tasks = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("malformed row in {}", path.display()))?;
        let Some(domain) = row.get(0).map(str::trim).filter(|d| !d.is_empty()) else {
            continue;
        };
        let target_email = row
            .get(1)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        tasks.push(DomainTask {
            domain: domain.to_string(),
            target_email,
        });
    }
    Ok(tasks)
}

/// Write a starter domain list for `formscout init`.
pub fn write_sample(path: &Path) -> Result<()> {
    let sample = "\
# Domains to audit - format: domain,email (optional)
example.com,contact@example.com
testsite.org
";
    std::fs::write(path, sample)
        .with_context(|| format!("failed to write {}", path.display()))
}
