// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use formscout::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "formscout",
    about = "Formscout — contact-channel reachability auditor",
    version,
    after_help = "Run 'formscout <command> --help' for details on each command."
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit the domain list (or one domain) and record outcomes
    Process {
        /// Single domain to audit instead of the domain list
        domain: Option<String>,
        /// Start time "YYYY-MM-DD HH:MM" (local); waits until then
        #[arg(long)]
        schedule: Option<String>,
        /// Result log path (default results.csv)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Concurrent domain workers
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Create the working files (domain list, evidence directory)
    Init,
    /// Add an email address to the suppression list
    Suppress {
        /// Address never to contact again
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "formscout=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "formscout=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let result = match cli.command {
        Commands::Process {
            domain,
            schedule,
            output,
            concurrency,
        } => {
            cli::process_cmd::run(cli::process_cmd::ProcessArgs {
                domain,
                schedule,
                output,
                concurrency,
            })
            .await
        }
        Commands::Init => cli::init_cmd::run(),
        Commands::Suppress { email } => cli::suppress_cmd::run(&email),
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}
