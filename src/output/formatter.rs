use std::io::IsTerminal;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use terminal_size::{terminal_size, Width};

use crate::scoring::{GateReport, ScenarioDiff, Tier};
use crate::session::Evaluation;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Composite with two decimals; a trailing asterisk marks a weight mismatch
pub fn format_composite(composite: f64, mismatch: bool) -> String {
    if mismatch {
        format!("{:.2}*", composite)
    } else {
        format!("{:.2}", composite)
    }
}

/// Parse "#rrggbb" (leading '#' optional) into RGB
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn paint_tier(label: &str, tiers: &[Tier]) -> String {
    let color = tiers
        .iter()
        .find(|t| t.label == label)
        .and_then(|t| parse_hex_color(&t.color));
    match color {
        Some((r, g, b)) => label.truecolor(r, g, b).bold().to_string(),
        None => label.bold().to_string(),
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate to fit available width, accounting for Unicode
fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Rank table: rank, composite, tier, subject id. No headers.
/// Rank column: 4 chars ("999."), composite right-aligned in 8
pub fn format_rank_table(eval: &Evaluation, tiers: &[Tier], use_colors: bool) -> String {
    if eval.entries.is_empty() {
        return "No subjects to rank.".to_string();
    }

    let term_width = get_terminal_width();
    let rank_width = 4;
    let score_width = 8;
    let tier_width = tiers.iter().map(|t| t.label.chars().count()).max().unwrap_or(1);
    let separator = "  ";
    let fixed_width = rank_width + score_width + tier_width + separator.len() * 3;

    eval.entries
        .iter()
        .map(|entry| {
            let rank_str = format!("{:>3}.", entry.rank);
            let score_str = format!(
                "{:>width$}",
                format_composite(entry.composite, eval.is_mismatched(&entry.subject_id)),
                width = score_width
            );
            let label = entry.tier.as_deref().unwrap_or("-");
            let pad = " ".repeat(tier_width.saturating_sub(label.chars().count()));

            let subject = match term_width {
                Some(width) if width > fixed_width + 10 => truncate(&entry.subject_id, width - fixed_width),
                Some(_) => truncate(&entry.subject_id, 20),
                None => entry.subject_id.clone(),
            };

            if use_colors {
                format!(
                    "{}{}{}{}{}{}{}{}",
                    rank_str.dimmed(),
                    separator,
                    score_str.bold(),
                    separator,
                    paint_tier(label, tiers),
                    pad,
                    separator,
                    subject
                )
            } else {
                format!(
                    "{}{}{}{}{}{}{}{}",
                    rank_str, separator, score_str, separator, label, pad, separator, subject
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tab-separated rows for scripting: rank, composite, tier, subject
pub fn format_tsv(eval: &Evaluation) -> String {
    eval.entries
        .iter()
        .map(|e| {
            format!(
                "{}\t{:.2}\t{}\t{}",
                e.rank,
                e.composite,
                e.tier.as_deref().unwrap_or(""),
                e.subject_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_json(eval: &Evaluation) -> Result<String> {
    serde_json::to_string_pretty(eval).context("Failed to serialize evaluation")
}

/// Per-tier totals, e.g. "S: 2  A: 5  B: 1"
pub fn format_tier_summary(eval: &Evaluation) -> String {
    eval.tier_counts
        .iter()
        .rev()
        .map(|(label, n)| format!("{}: {}", label, n))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One line per (rater, factor) column
pub fn format_gate_report(report: &GateReport, use_colors: bool) -> String {
    if report.results.is_empty() {
        return "No rater columns to check.".to_string();
    }

    report
        .results
        .iter()
        .map(|r| {
            let status = if r.valid { "PASS" } else { "FAIL" };
            let status = match (use_colors, r.valid) {
                (false, _) => status.to_string(),
                (true, true) => status.green().to_string(),
                (true, false) => status.red().bold().to_string(),
            };
            let mean = if r.count == 0 {
                "-".to_string()
            } else {
                format!("{:.2}", r.mean)
            };
            format!(
                "{} {} / {}: mean {} (target {:.2} ± {:.2}, n={})",
                status, r.rater_id, r.factor_id, mean, r.target, r.tolerance, r.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_hidden_gems(diff: &ScenarioDiff, baseline: &str, alternative: &str, use_colors: bool) -> String {
    let note = (!diff.mismatched.is_empty())
        .then(|| format!("Weights do not sum to 1.0 for: {}", diff.mismatched.join(", ")));

    if diff.only_in_b.is_empty() {
        let summary = format!(
            "Top {} under '{}' are all in the top {} under '{}'.",
            diff.top_n, alternative, diff.top_n, baseline
        );
        return std::iter::once(summary).chain(note).collect::<Vec<_>>().join("\n");
    }

    let header = format!(
        "In the top {} under '{}' but not under '{}':",
        diff.top_n, alternative, baseline
    );
    let rows = diff.only_in_b.iter().map(|e| {
        let line = format!("  {:>3}. {:>8.2}  {}", e.rank, e.composite, e.subject_id);
        if use_colors {
            line.yellow().to_string()
        } else {
            line
        }
    });

    std::iter::once(header)
        .chain(rows)
        .chain(note)
        .collect::<Vec<_>>()
        .join("\n")
}
