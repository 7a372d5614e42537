//! Dependency license decisions: an append-only decision log that can inherit
//! other projects' logs, and a compliance check of scanned dependencies
//! against the decisions it records.
//!
//! - [`decisions`] — the decision store and its persisted format.
//! - [`license`] — license name resolution and SPDX expression evaluation.
//! - [`check`] — applying the decisions to scanner output.
//! - [`report`] — terminal rendering for the `license-ledger` binary.

pub mod check;
pub mod cli;
pub mod config;
pub mod decisions;
pub mod license;
pub mod models;
pub mod report;
