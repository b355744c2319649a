//! Console summaries, vault inventory and the CSV report.

use crate::item::ItemSummary;
use crate::outcome::{Ledger, Plan};
use crate::{Options, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix of every report file name.
pub const REPORT_PREFIX: &str = "1password_document_reattacher_report";

/// Which engine produced a ledger; decides the report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Reattach,
    Cleanup,
}

/// Result of running an engine.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub ledger: Ledger,
    /// Written report, `None` when the run stopped before changing anything
    pub report: Option<PathBuf>,
}

/// Counts of `keys`, most frequent first, ties by name.
fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

fn write_tally(
    out: &mut impl Write,
    heading: &str,
    counts: &[(&str, usize)],
    total: usize,
) -> std::io::Result<()> {
    writeln!(out, "{}:", heading)?;
    let width = counts.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    for (key, count) in counts {
        let percent = if total == 0 {
            0.0
        } else {
            *count as f64 * 100.0 / total as f64
        };
        writeln!(out, "  {:<width$}  {:>6}  {:>5.1}%", key, count, percent, width = width)?;
    }
    Ok(())
}

/// Writes item counts by vault, category and tag.
pub fn write_inventory(out: &mut impl Write, items: &[ItemSummary]) -> std::io::Result<()> {
    let total = items.len();
    writeln!(out, "Found {} items.", total)?;

    let vaults = tally(items.iter().map(|i| i.vault.name.as_str()));
    write_tally(out, "Vaults", &vaults, total)?;

    let categories: Vec<String> = items.iter().map(|i| i.category.to_string()).collect();
    let categories = tally(categories.iter().map(String::as_str));
    write_tally(out, "Categories", &categories, total)?;

    let tags = tally(items.iter().flat_map(|i| i.tags.iter().map(String::as_str)));
    write_tally(out, "Tags", &tags, total)?;
    Ok(())
}

/// Prints the vault inventory on stdout.
pub fn print_inventory(items: &[ItemSummary]) {
    if let Err(e) = write_inventory(&mut std::io::stdout().lock(), items) {
        tracing::warn!(error = %e, "failed to print inventory");
    }
}

/// Writes the planned reattachments shown before asking for confirmation.
pub fn write_reattach_plan(out: &mut impl Write, plan: &Plan) -> std::io::Result<()> {
    writeln!(
        out,
        "Found {} documents to reattach to {} items.",
        plan.reattachments_by_document().len(),
        plan.item_count()
    )?;
    for r in &plan.reattachments {
        writeln!(out, "  '{}' to '{}'", r.display_name, r.item.title)?;
    }
    Ok(())
}

/// Writes the planned reattachments and removals of a cleanup run.
pub fn write_cleanup_plan(out: &mut impl Write, plan: &Plan) -> std::io::Result<()> {
    writeln!(out, "Found {} documents to reattach.", plan.reattachments.len())?;
    for r in &plan.reattachments {
        writeln!(out, "  '{}' to '{}'", r.display_name, r.item.title)?;
    }

    writeln!(out, "Found {} documents to remove.", plan.removals.len())?;
    for (reason, removals) in Plan::removals_by_reason(&plan.removals) {
        writeln!(out, "  {}: {}", reason, removals.len())?;
        for r in removals {
            writeln!(out, "    {}", r.document.title)?;
        }
    }
    Ok(())
}

/// Prints the reattach plan on stdout.
pub fn print_reattach_plan(plan: &Plan) {
    if let Err(e) = write_reattach_plan(&mut std::io::stdout().lock(), plan) {
        tracing::warn!(error = %e, "failed to print plan");
    }
}

/// Prints the cleanup plan on stdout.
pub fn print_cleanup_plan(plan: &Plan) {
    if let Err(e) = write_cleanup_plan(&mut std::io::stdout().lock(), plan) {
        tracing::warn!(error = %e, "failed to print plan");
    }
}

/// Lists removals awaiting approval.
pub fn print_pending(plan: &Plan) {
    println!(
        "{} documents did not match any item and would be removed:",
        plan.pending.len()
    );
    for r in &plan.pending {
        println!("  {}", r.document.title);
    }
}

/// Writes the end-of-run summary.
pub fn write_summary(
    out: &mut impl Write,
    ledger: &Ledger,
    kind: RunKind,
    options: &Options,
) -> std::io::Result<()> {
    if options.dry_run {
        writeln!(out, "DRY RUN: No changes were made.")?;
    }

    writeln!(
        out,
        "Reattached {} documents to {} items.",
        ledger.reattached_document_count(),
        ledger.reattached_item_count()
    )?;
    if kind == RunKind::Cleanup {
        writeln!(out, "Removed {} documents.", ledger.removed.len())?;
        if options.verbose {
            for (reason, removals) in Plan::removals_by_reason(&ledger.removed) {
                writeln!(out, "  {}: {}", reason, removals.len())?;
            }
        }
    }

    if ledger.skipped_count() > 0 {
        writeln!(out, "Skipped {}:", ledger.skipped_count())?;
        for (reason, entries) in &ledger.skipped {
            writeln!(out, "  {}: {}", reason, entries.len())?;
            if options.verbose {
                for s in entries {
                    writeln!(out, "    {} {}", s.item, s.document)?;
                }
            }
        }
    }

    if ledger.failed_count() > 0 {
        writeln!(out, "Failed {}:", ledger.failed_count())?;
        for (kind, entries) in &ledger.failed {
            writeln!(out, "  {}: {}", kind, entries.len())?;
            if options.verbose {
                for f in entries {
                    writeln!(out, "    {} {}: {}", f.item, f.document, f.error)?;
                }
            }
        }
    }
    Ok(())
}

/// Prints the end-of-run summary on stdout.
pub fn print_summary(ledger: &Ledger, kind: RunKind, options: &Options) {
    if let Err(e) = write_summary(&mut std::io::stdout().lock(), ledger, kind, options) {
        tracing::warn!(error = %e, "failed to print summary");
    }
}

/// File name of a report written at `now`.
pub fn report_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{}_{}.csv", REPORT_PREFIX, now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Writes the ledger as CSV.
pub fn write_csv<W: Write>(writer: W, ledger: &Ledger, kind: RunKind) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    match kind {
        RunKind::Reattach => {
            wtr.write_record(["item", "document", "item link", "status"])?;
            for r in &ledger.reattached {
                wtr.write_record([
                    r.item.title.as_str(),
                    &r.display_name,
                    &r.item_link,
                    "reattached",
                ])?;
            }
            for (reason, entries) in &ledger.skipped {
                let status = format!("skipped: {}", reason);
                for s in entries {
                    wtr.write_record([&s.item, &s.document, &s.item_link, &status])?;
                }
            }
            for (kind, entries) in &ledger.failed {
                for f in entries {
                    let status = format!("error: {}: {}", kind, f.error);
                    wtr.write_record([&f.item, &f.document, &f.item_link, &status])?;
                }
            }
        }
        RunKind::Cleanup => {
            wtr.write_record(["document", "action", "item", "reason"])?;
            for r in &ledger.reattached {
                wtr.write_record([
                    r.document.title.as_str(),
                    "reattached",
                    &r.item.title,
                    "matched by item/doc name",
                ])?;
            }
            for r in &ledger.removed {
                let reason = r.reason.to_string();
                wtr.write_record([
                    r.document.title.as_str(),
                    "removed",
                    r.referenced_by.as_deref().unwrap_or_default(),
                    &reason,
                ])?;
            }
            for (reason, entries) in &ledger.skipped {
                let reason = reason.to_string();
                for s in entries {
                    wtr.write_record([s.document.as_str(), "skipped", &s.item, &reason])?;
                }
            }
            for (kind, entries) in &ledger.failed {
                for f in entries {
                    let reason = format!("{}: {}", kind, f.error);
                    wtr.write_record([f.document.as_str(), "failed", &f.item, &reason])?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the report into `dir` and returns its path.
pub fn write_report(ledger: &Ledger, kind: RunKind, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(report_file_name(chrono::Local::now()));
    let file = std::fs::File::create(&path)?;
    write_csv(file, ledger, kind)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}
