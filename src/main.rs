//! `license-ledger` — record license decisions, inherit them from other
//! projects, and check dependencies against them.
//!
//! # Flow
//! 1. Parse CLI arguments ([`license_ledger::cli`]).
//! 2. Load config ([`load_config`]) and locate the decisions file.
//! 3. Replay the decisions file into a [`Decisions`] store,
//!    fetching inherited sources as they are met.
//! 4. Either record one new decision and save the log, render the decisions
//!    (`show`), or check dependencies against them (`check`, [`check::check`]).
//! 5. `check` exits `1` when any dependency is not approved.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use license_ledger::cli::{Cli, Command, ReportFormat};
use license_ledger::config::load_config;
use license_ledger::decisions::{Decisions, Fetcher, SourceFetcher, Txn};
use license_ledger::models::PolicyVerdict;
use license_ledger::{check, report};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = cli
        .project
        .canonicalize()
        .unwrap_or_else(|_| cli.project.clone());

    let config = load_config(&path, cli.config.as_deref())?;
    let decisions_path = match &cli.decisions_file {
        Some(file) => file.clone(),
        None => config.decisions_path(&path),
    };

    let fetcher = SourceFetcher::new(&config.fetch.user_agent, config.fetch_timeout())?;
    let mut store = with_spinner(cli.quiet, "Loading decisions", || {
        Decisions::fetch_saved(&decisions_path, fetcher)
    })??;
    tracing::debug!(
        path = %decisions_path.display(),
        recorded = store.decisions().len(),
        "decisions loaded"
    );

    if !cli.command.is_mutation() {
        return run_query(&cli, &store, &path);
    }

    let txn = Txn::now(cli.who.clone(), cli.why.clone());
    let summary = record(&mut store, &cli.command, txn, cli.quiet)?;

    store.save(&decisions_path)?;
    tracing::info!(path = %decisions_path.display(), "decisions saved");

    if !cli.quiet {
        eprintln!("  {} {}", "→".cyan(), summary);
    }

    Ok(())
}

/// Apply a mutating command and describe what was recorded.
fn record<F: Fetcher>(
    store: &mut Decisions<F>,
    command: &Command,
    txn: Txn,
    quiet: bool,
) -> Result<String> {
    let summary = match command {
        Command::AddPackage { name, version } => {
            store.add_package(name, version.as_deref(), txn);
            format!("added package {}", name)
        }
        Command::RemovePackage { name } => {
            store.remove_package(name, txn);
            format!("removed package {}", name)
        }
        Command::License { name, license } => {
            store.license(name, license, txn);
            format!("licensed {} under {}", name, license)
        }
        Command::Unlicense { name, license } => {
            store.unlicense(name, license, txn);
            format!("removed license {} from {}", license, name)
        }
        Command::Homepage { name, url } => {
            store.homepage(name, url, txn);
            format!("set homepage of {} to {}", name, url)
        }
        Command::Approve { names, versions } => {
            for name in names {
                store.approve(name, versions, txn.clone());
            }
            if versions.is_empty() {
                format!("approved {}", names.join(", "))
            } else {
                format!("approved {} ({})", names.join(", "), versions.join(", "))
            }
        }
        Command::Unapprove { names } => {
            for name in names {
                store.unapprove(name, txn.clone());
            }
            format!("unapproved {}", names.join(", "))
        }
        Command::Permit { licenses } => {
            for license in licenses {
                store.permit(license, txn.clone());
            }
            format!("permitted {}", licenses.join(", "))
        }
        Command::Unpermit { licenses } => {
            for license in licenses {
                store.unpermit(license, txn.clone());
            }
            format!("unpermitted {}", licenses.join(", "))
        }
        Command::Restrict { licenses } => {
            for license in licenses {
                store.restrict(license, txn.clone());
            }
            format!("restricted {}", licenses.join(", "))
        }
        Command::Unrestrict { licenses } => {
            for license in licenses {
                store.unrestrict(license, txn.clone());
            }
            format!("unrestricted {}", licenses.join(", "))
        }
        Command::Ignore { names } => {
            for name in names {
                store.ignore(name, txn.clone());
            }
            format!("ignoring {}", names.join(", "))
        }
        Command::Heed { names } => {
            for name in names {
                store.heed(name, txn.clone());
            }
            format!("heeding {}", names.join(", "))
        }
        Command::IgnoreGroup { groups } => {
            for group in groups {
                store.ignore_group(group, txn.clone());
            }
            format!("ignoring groups {}", groups.join(", "))
        }
        Command::HeedGroup { groups } => {
            for group in groups {
                store.heed_group(group, txn.clone());
            }
            format!("heeding groups {}", groups.join(", "))
        }
        Command::NameProject { name } => {
            store.name_project(name, txn);
            format!("named project {}", name)
        }
        Command::UnnameProject => {
            store.unname_project(txn);
            "cleared project name".to_string()
        }
        Command::InheritFrom { location } => {
            with_spinner(quiet, &format!("Fetching {}", location), || {
                store.inherit_from(location, txn).map(|_| ())
            })??;
            format!("inheriting decisions from {}", location)
        }
        Command::RemoveInheritance { location } => {
            store.remove_inheritance(location);
            format!("no longer inheriting from {}", location)
        }
        Command::Show | Command::Check { .. } => unreachable!("not a mutation"),
    };

    Ok(summary)
}

fn run_query<F: Fetcher>(cli: &Cli, store: &Decisions<F>, path: &Path) -> Result<()> {
    match &cli.command {
        Command::Show => report::terminal::render_decisions(store.state(), store.decisions().len()),
        Command::Check {
            deps,
            report: format,
            verbose,
        } => {
            let scanned = match deps {
                Some(file) => check::load_dependencies(file)?,
                None => Vec::new(),
            };
            let results = check::check(store.state(), &scanned);

            match format {
                ReportFormat::Terminal => {
                    report::terminal::render_check(&results, store.state(), path, *verbose, cli.quiet)?;
                }
                ReportFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
            }

            // Exit code: 1 if anything still needs a decision or is restricted
            if results.iter().any(|r| r.verdict != PolicyVerdict::Pass) {
                std::process::exit(1);
            }
            Ok(())
        }
        _ => unreachable!("mutations are recorded, not queried"),
    }
}

/// Run `work` behind a spinner unless `quiet`; inheritance fetches may block on the network.
fn with_spinner<T>(quiet: bool, message: &str, work: impl FnOnce() -> T) -> Result<T> {
    if quiet {
        return Ok(work());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = work();
    pb.finish_and_clear();
    Ok(result)
}
