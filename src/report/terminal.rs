use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::decisions::DecisionState;
use crate::models::{CheckedDependency, PolicyVerdict};

/// Render a colored check report.
pub fn render_check(
    results: &[CheckedDependency],
    state: &DecisionState,
    path: &Path,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let total = results.len();
    let pass_count = count(results, PolicyVerdict::Pass);
    let warn_count = count(results, PolicyVerdict::Warn);
    let error_count = count(results, PolicyVerdict::Error);

    if quiet {
        println!(
            "Total: {}  Pass: {}  Warn: {}  Error: {}",
            total,
            pass_count.to_string().green(),
            warn_count.to_string().yellow(),
            error_count.to_string().red(),
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "license-ledger".bold(),
        env!("CARGO_PKG_VERSION")
    );
    let project = state
        .project_name()
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    println!(" Project: {}\n", project);

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Total dependencies : {}", total));
    println!(
        " │  {:<48} │",
        format!(
            "{}  Pass            : {:>4}  {}",
            "✓".green(),
            pass_count,
            summarize_licenses(results, PolicyVerdict::Pass)
        )
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Warn            : {:>4}  {}",
            "⚠".yellow(),
            warn_count,
            summarize_licenses(results, PolicyVerdict::Warn)
        )
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Error           : {:>4}  {}",
            "✗".red(),
            error_count,
            summarize_licenses(results, PolicyVerdict::Error)
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if error_count > 0 {
        println!(" {} Restricted dependencies:\n", "[ERROR]".red().bold());
        render_table(results, PolicyVerdict::Error);
        println!();
    }

    if warn_count > 0 {
        println!(" {} Dependencies awaiting a decision:\n", "[WARN]".yellow().bold());
        render_table(results, PolicyVerdict::Warn);
        println!();
    }

    if verbose && pass_count > 0 {
        println!(" {} Approved dependencies:\n", "[PASS]".green().bold());
        render_table(results, PolicyVerdict::Pass);
        println!();
    }

    Ok(())
}

fn count(results: &[CheckedDependency], verdict: PolicyVerdict) -> usize {
    results.iter().filter(|d| d.verdict == verdict).count()
}

fn render_table(results: &[CheckedDependency], verdict_filter: PolicyVerdict) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("License").add_attribute(Attribute::Bold),
            Cell::new("Reason").add_attribute(Attribute::Bold),
            Cell::new("Verdict").add_attribute(Attribute::Bold),
        ]);

    for dep in results.iter().filter(|d| d.verdict == verdict_filter) {
        let (verdict_str, verdict_color) = match dep.verdict {
            PolicyVerdict::Pass => ("✓ pass", Color::Green),
            PolicyVerdict::Warn => ("⚠ warn", Color::Yellow),
            PolicyVerdict::Error => ("✗ error", Color::Red),
        };

        let name = if dep.manual {
            format!("{} (manual)", dep.name)
        } else {
            dep.name.clone()
        };

        table.add_row(vec![
            Cell::new(name),
            Cell::new(dep.version.as_deref().unwrap_or("-")),
            Cell::new(dep.license_label()),
            Cell::new(dep.reason.to_string()),
            Cell::new(verdict_str)
                .fg(verdict_color)
                .set_alignment(CellAlignment::Center),
        ]);
    }

    println!("{}", table);
}

fn summarize_licenses(results: &[CheckedDependency], verdict: PolicyVerdict) -> String {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for dep in results.iter().filter(|d| d.verdict == verdict) {
        *counts.entry(dep.license_label()).or_insert(0) += 1;
    }

    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(lic, cnt)| format!("{} ({})", lic, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}

/// Render the current decision state.
pub fn render_decisions(state: &DecisionState, recorded: usize) -> Result<()> {
    println!(
        "\n {} v{}",
        "license-ledger".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        " Project: {}",
        state.project_name().unwrap_or("(unnamed)")
    );
    println!(" Recorded decisions: {}\n", recorded);

    print_set("Permitted licenses", state.permitted(), |s| s.green());
    print_set("Restricted licenses", state.restricted(), |s| s.red());
    print_set("Ignored packages", state.ignored(), |s| s.dimmed());
    print_set("Ignored groups", state.ignored_groups(), |s| s.dimmed());
    print_set("Inherited from", state.inherited_sources(), |s| s.cyan());

    if !state.approvals().is_empty() {
        println!(" {}", "Approvals".bold());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Name").add_attribute(Attribute::Bold),
                Cell::new("Versions").add_attribute(Attribute::Bold),
                Cell::new("Who").add_attribute(Attribute::Bold),
                Cell::new("Why").add_attribute(Attribute::Bold),
                Cell::new("When").add_attribute(Attribute::Bold),
            ]);
        for (name, approval) in state.approvals() {
            let versions = if approval.is_unrestricted() {
                "all".to_string()
            } else {
                approval
                    .safe_versions
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(versions),
                Cell::new(approval.who.as_deref().unwrap_or("-")),
                Cell::new(approval.why.as_deref().unwrap_or("-")),
                Cell::new(
                    approval
                        .approved_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        println!("{}\n", table);
    }

    let packages: Vec<_> = state.packages().collect();
    if !packages.is_empty() {
        println!(" {}", "Manual packages".bold());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Name").add_attribute(Attribute::Bold),
                Cell::new("Version").add_attribute(Attribute::Bold),
                Cell::new("Licenses").add_attribute(Attribute::Bold),
                Cell::new("Homepage").add_attribute(Attribute::Bold),
            ]);
        for (name, version) in packages {
            let licenses = state
                .licenses_of(name)
                .into_iter()
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                Cell::new(name),
                Cell::new(version.unwrap_or("-")),
                Cell::new(licenses),
                Cell::new(state.homepage_of(name).unwrap_or("-")),
            ]);
        }
        println!("{}\n", table);
    }

    Ok(())
}

fn print_set(title: &str, items: &BTreeSet<String>, paint: impl Fn(&str) -> ColoredString) {
    if items.is_empty() {
        return;
    }
    let painted: Vec<String> = items.iter().map(|i| paint(i).to_string()).collect();
    println!(" {:<20} {}", format!("{}:", title).bold(), painted.join(", "));
}
