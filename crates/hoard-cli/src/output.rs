use colored::*;
use std::path::Path;

use hoard_core::{
    Classification, DeletionOutcome, DeletionPlan, DisposalMethod, ResultRow, ResultSet, Tier,
    ViewOptions,
};

const SIZE_WIDTH: usize = 10;
const CREATED_WIDTH: usize = 16;
const STATUS_WIDTH: usize = 9;

pub fn tier_badge(tier: Tier) -> ColoredString {
    colorize(&tier_label(tier), tier)
}

/// Prints the visible rows as a numbered table followed by a totals line.
pub fn print_results(rows: &[ResultRow<'_>], results: &ResultSet, options: &ViewOptions) {
    if rows.is_empty() {
        println!("{}", "No matching files.".dimmed());
        return;
    }

    let index_width = rows.len().to_string().len();
    let header = format!(
        "{:>iw$}  {:<sw$}  {:>zw$}  {:<cw$}  {}",
        "#",
        "Status",
        "Size",
        "Created",
        "Path",
        iw = index_width,
        sw = STATUS_WIDTH,
        zw = SIZE_WIDTH,
        cw = CREATED_WIDTH,
    );
    println!("{}", header.bold());

    for (index, row) in rows.iter().enumerate() {
        let record = row.record;
        // Pad before colouring so escape codes do not skew the columns.
        let status = format!("{:<width$}", tier_label(row.classification.tier), width = STATUS_WIDTH);
        println!(
            "{:>iw$}  {}  {:>zw$}  {:<cw$}  {}",
            index + 1,
            colorize(&status, row.classification.tier),
            record.formatted_size(),
            record.formatted_created(),
            record.path().display(),
            iw = index_width,
            zw = SIZE_WIDTH,
            cw = CREATED_WIDTH,
        );
    }

    let shown_bytes: u64 = rows.iter().map(|r| r.record.size_bytes()).sum();
    println!();
    println!(
        "Showing {} of {} files, {} (sorted by {:?}, {:?})",
        rows.len().to_string().cyan(),
        results.len().to_string().cyan(),
        humansize::format_size(shown_bytes, humansize::BINARY).cyan(),
        options.sort,
        options.direction,
    );
}

pub fn print_classification(path: &Path, classification: &Classification) {
    println!(
        "{}  {}  {}",
        tier_badge(classification.tier),
        path.display(),
        classification.reason.dimmed()
    );
}

pub fn print_plan(plan: &DeletionPlan) {
    println!(
        "{} {} files, {} estimated:",
        tier_badge(plan.tier()),
        plan.len().to_string().bold(),
        plan.formatted_estimate().bold(),
    );
    for candidate in plan.candidates() {
        println!(
            "  {:>zw$}  {}  {}",
            humansize::format_size(candidate.size_bytes, humansize::BINARY),
            candidate.path.display(),
            candidate.reason.dimmed(),
            zw = SIZE_WIDTH,
        );
    }
}

pub fn print_outcome(outcome: &DeletionOutcome, method: DisposalMethod) {
    let verb = match method {
        DisposalMethod::Trash => "Moved to trash",
        DisposalMethod::Permanent => "Deleted",
    };
    let failed = if outcome.failed > 0 {
        outcome.failed.to_string().red()
    } else {
        outcome.failed.to_string().normal()
    };
    println!(
        "{}: {}, failed: {}",
        verb,
        outcome.succeeded.to_string().green(),
        failed
    );
}

fn tier_label(tier: Tier) -> String {
    format!("{} {}", tier.dot(), tier.label())
}

fn colorize(text: &str, tier: Tier) -> ColoredString {
    match tier {
        Tier::Safe => text.green(),
        Tier::Caution => text.yellow(),
        Tier::System => text.red(),
    }
}
