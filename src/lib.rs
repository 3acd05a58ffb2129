// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Formscout library — contact-channel reachability auditor.
//!
//! Crawls a domain, classifies its contact forms, decides on exactly one
//! contact action (form submission, SMTP fallback, or a reason-coded skip)
//! and records one auditable outcome per domain per run.
//!
//! This library crate exposes the core modules for integration testing.

pub mod classify;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod decision;
pub mod extract;
pub mod interact;
pub mod lexicon;
pub mod mail;
pub mod orchestrate;
pub mod outcome;
pub mod protection;
pub mod runner;
pub mod store;
