//! CSV-backed operator files — domain list, result log, suppression store.

pub mod domains;
pub mod results;
pub mod suppression;
