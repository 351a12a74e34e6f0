//! End-of-run report: statistics table, per-account lines, JSON export

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use orchestrator::{AccountReport, RunSummary};

/// Render the summary printed once at the end of a run.
pub fn render(summary: &RunSummary) -> String {
    let s = &summary.stats;
    let rows = [
        ("Total accounts", s.total),
        ("Processed", s.processed),
        ("Success", s.success),
        ("Failed", s.failed),
        ("Locked", s.locked),
        ("Suspended", s.suspended),
    ];
    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = rows
        .iter()
        .map(|(_, value)| value.to_string().len())
        .max()
        .unwrap_or(0)
        .max("Value".len());
    let border = format!(
        "+{}+{}+",
        "-".repeat(label_width + 2),
        "-".repeat(value_width + 2)
    );

    let mut out = String::new();
    let _ = writeln!(out, "{border}");
    let _ = writeln!(out, "| {:<label_width$} | {:>value_width$} |", "Statistic", "Value");
    let _ = writeln!(out, "{border}");
    for (label, value) in rows {
        let _ = writeln!(out, "| {label:<label_width$} | {value:>value_width$} |");
    }
    let _ = writeln!(out, "{border}");
    if summary.cancelled {
        let _ = writeln!(out, "run cancelled before every account was processed");
    }

    if !summary.accounts.is_empty() {
        let _ = writeln!(out);
        for account in &summary.accounts {
            let _ = writeln!(out, "{}", account_line(account));
        }
    }
    out
}

fn account_line(report: &AccountReport) -> String {
    let who = if report.username.is_empty() {
        report.token_hint.clone()
    } else {
        format!("@{} ({})", report.username, report.token_hint)
    };
    let mut line = format!(
        "#{:<3} {who} {} [{}]",
        report.index + 1,
        report.outcome,
        report.status
    );
    if !report.completed.is_empty() {
        let _ = write!(line, " done: {}", report.completed.join(", "));
    }
    if !report.failed.is_empty() {
        let _ = write!(line, " failed: {}", report.failed.join(", "));
    }
    if !report.skipped.is_empty() {
        let _ = write!(line, " skipped: {}", report.skipped.join(", "));
    }
    line
}

/// Write the summary as pretty JSON.
pub fn write_json(summary: &RunSummary, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
