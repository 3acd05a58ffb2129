//! `formscout init` — create the working files for a fresh checkout.

use crate::config::{DOMAINS_FILE, EVIDENCE_DIR};
use crate::store::domains;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run() -> Result<()> {
    let domains_path = Path::new(DOMAINS_FILE);
    if domains_path.exists() {
        println!("{DOMAINS_FILE} already exists, leaving it alone");
    } else {
        domains::write_sample(domains_path)?;
        println!("created {DOMAINS_FILE} with sample entries");
    }

    std::fs::create_dir_all(EVIDENCE_DIR)
        .with_context(|| format!("failed to create {EVIDENCE_DIR}/"))?;
    println!("created {EVIDENCE_DIR}/ for submission screenshots");

    println!("\nNext steps:");
    println!("  1. Edit {DOMAINS_FILE} with the domains to audit");
    println!("  2. Export FORMSCOUT_SMTP_USER / FORMSCOUT_SMTP_PASSWORD for email fallback");
    println!("  3. Run: formscout process");
    Ok(())
}
