//! `formscout suppress <email>` — manually suppress an address.

use crate::config::SUPPRESSION_FILE;
use crate::store::suppression::SuppressionStore;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(email: &str) -> Result<()> {
    let store = SuppressionStore::load(PathBuf::from(SUPPRESSION_FILE))?;
    if store.contains(email) {
        println!("{email} is already suppressed");
        return Ok(());
    }
    store.append(email, "Manual addition")?;
    println!("added {email} to {SUPPRESSION_FILE}");
    Ok(())
}
