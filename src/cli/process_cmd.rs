//! `formscout process` — run the audit pipeline over the domain list.

use crate::config::{RunConfig, DOMAINS_FILE};
use crate::interact::chromium::ChromiumInteractor;
use crate::mail::SmtpMailer;
use crate::outcome::{OutcomeRecord, Status};
use crate::runner::Runner;
use crate::store::domains::{self, DomainTask};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProcessArgs {
    /// Audit a single domain instead of the domain list.
    pub domain: Option<String>,
    /// Local start time, "YYYY-MM-DD HH:MM".
    pub schedule: Option<String>,
    /// Result log path override.
    pub output: Option<PathBuf>,
    /// Worker count override.
    pub concurrency: Option<usize>,
}

pub async fn run(args: ProcessArgs) -> Result<()> {
    let mut config = RunConfig::from_env();
    if let Some(output) = args.output {
        config.results_path = output;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }

    let tasks = match &args.domain {
        Some(domain) => vec![DomainTask::new(domain.clone())],
        None => domains::load(Path::new(DOMAINS_FILE))
            .with_context(|| format!("could not read {DOMAINS_FILE}; run 'formscout init'"))?,
    };
    if tasks.is_empty() {
        println!("nothing to do: {DOMAINS_FILE} has no entries");
        return Ok(());
    }

    if let Some(schedule) = &args.schedule {
        wait_until(schedule).await?;
    }

    if !config.smtp.is_configured() {
        warn!("SMTP credentials not set; email fallback will fail as SMTP_ERROR");
    }

    // The browser itself launches on the first form submission, so runs
    // that never submit work without Chromium installed.
    let interactor = ChromiumInteractor::new(config.evidence_dir.clone(), config.limits.timeout_ms)
        .context("could not prepare the evidence directory")?;
    let mailer = SmtpMailer::new(&config.smtp)?;
    let results_path = config.results_path.clone();
    let runner = Runner::new(config, Arc::new(interactor), Arc::new(mailer))?;

    // First Ctrl-C stops scheduling new domains; in-flight ones finish.
    let cancel_handle = runner.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight domains");
            cancel_handle.cancel();
        }
    });

    let records = runner.process_all(tasks).await?;
    print_summary(&records, &results_path);
    Ok(())
}

/// Sleep until the given local wall-clock time. A time in the past starts
/// immediately.
async fn wait_until(schedule: &str) -> Result<()> {
    let naive = NaiveDateTime::parse_from_str(schedule, "%Y-%m-%d %H:%M")
        .with_context(|| format!("invalid schedule {schedule:?}, expected YYYY-MM-DD HH:MM"))?;
    let target = Local
        .from_local_datetime(&naive)
        .single()
        .with_context(|| format!("ambiguous local time {schedule:?}"))?;

    let wait = (target - Local::now()).to_std().unwrap_or_default();
    if wait.is_zero() {
        return Ok(());
    }
    println!("scheduled for {schedule}, waiting {}s", wait.as_secs());
    tokio::time::sleep(wait).await;
    Ok(())
}

fn print_summary(records: &[OutcomeRecord], results_path: &Path) {
    let count = |status: Status| records.iter().filter(|r| r.status == status).count();
    println!("\nProcessed {} domain(s)", records.len());
    println!("  success: {}", count(Status::Success));
    println!("  failed:  {}", count(Status::Failed));
    println!("  skipped: {}", count(Status::Skipped));
    println!("  error:   {}", count(Status::Error));
    println!("Results written to {}", results_path.display());
}
