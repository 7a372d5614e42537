use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "license-ledger",
    about = "Record, inherit, and enforce dependency license decisions",
    version
)]
pub struct Cli {
    /// Project directory
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Config file [default: ./.license-ledger/config.toml, fallback ~/.config/license-ledger/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Decisions file, overriding the configured one
    #[arg(long, global = true, value_name = "FILE")]
    pub decisions_file: Option<PathBuf>,

    /// Who is making the decision
    #[arg(long, global = true)]
    pub who: Option<String>,

    /// Why the decision is being made
    #[arg(long, global = true)]
    pub why: Option<String>,

    /// Only print errors and summaries
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Declare a package that no manifest reports
    AddPackage {
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Remove a manually declared package
    RemovePackage { name: String },
    /// Set a license for a package, overriding scanned licenses
    License { name: String, license: String },
    /// Remove a license previously set for a package
    Unlicense { name: String, license: String },
    /// Set the homepage of a package
    Homepage { name: String, url: String },
    /// Approve packages regardless of their licenses
    Approve {
        #[arg(required = true)]
        names: Vec<String>,
        /// Only approve these versions (repeatable)
        #[arg(long = "version", value_name = "VERSION")]
        versions: Vec<String>,
    },
    /// Withdraw package approvals
    Unapprove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Allow licenses
    Permit {
        #[arg(required = true)]
        licenses: Vec<String>,
    },
    /// Stop allowing licenses
    Unpermit {
        #[arg(required = true)]
        licenses: Vec<String>,
    },
    /// Deny licenses
    Restrict {
        #[arg(required = true)]
        licenses: Vec<String>,
    },
    /// Stop denying licenses
    Unrestrict {
        #[arg(required = true)]
        licenses: Vec<String>,
    },
    /// Exclude packages from checks
    Ignore {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Include previously ignored packages again
    Heed {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Exclude dependency groups from checks
    IgnoreGroup {
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Include previously ignored dependency groups again
    HeedGroup {
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Name the project
    NameProject { name: String },
    /// Clear the project name
    UnnameProject,
    /// Inherit decisions from a file path or http(s) URL
    InheritFrom { location: String },
    /// Stop inheriting decisions from a location
    RemoveInheritance { location: String },
    /// Show the current decisions
    Show,
    /// Check scanned dependencies against the decisions
    Check {
        /// Scanner output: JSON array of {name, version, licenses, homepage, groups}
        #[arg(long, value_name = "FILE")]
        deps: Option<PathBuf>,

        /// Report format
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        report: ReportFormat,

        /// Show all dependencies (not just warnings/errors)
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Command {
    /// Whether the command changes the decisions file.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::Show | Command::Check { .. })
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}
