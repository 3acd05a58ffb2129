//! Page extraction — form candidates, email candidates, crawl links.

pub mod emails;
pub mod forms;
pub mod links;
