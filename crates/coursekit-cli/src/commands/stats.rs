//! The `coursekit stats` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use coursekit_core::report::StatisticsReport;
use coursekit_core::statistics::{fold_attempts, BlockAttempt};

pub fn execute(
    attempts_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = coursekit_grading::load_config_from(config_path.as_deref())?;

    let raw = std::fs::read_to_string(&attempts_path)
        .with_context(|| format!("failed to read attempts: {}", attempts_path.display()))?;
    let attempts: Vec<BlockAttempt> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse attempts: {}", attempts_path.display()))?;

    let rows = fold_attempts(&attempts);
    let report = StatisticsReport::with_threshold(&rows, config.attention.recent_mistake_threshold);

    if let Some(path) = &output {
        report.save_json(path)?;
    }

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&report, attempts.len()),
    }

    Ok(())
}

fn print_text(report: &StatisticsReport, attempt_count: usize) {
    println!(
        "{} attempts, {} students x blocks, {} need attention",
        attempt_count,
        report.rows.len(),
        report.needs_attention().len()
    );

    if report.blocks.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Item",
        "Block",
        "Students",
        "Attempts",
        "Success",
        "Never correct",
    ]);
    for b in &report.blocks {
        table.add_row(vec![
            Cell::new(b.schedule_item_id),
            Cell::new(&b.block_id),
            Cell::new(b.students),
            Cell::new(b.total_attempts),
            Cell::new(format!("{:.1}%", b.success_rate)),
            Cell::new(b.students_never_correct),
        ]);
    }
    println!("\n{table}");

    let attention = report.needs_attention();
    if !attention.is_empty() {
        println!("\nNeeds attention:");
        for r in attention {
            let reason = if r.has_never_been_correct {
                "never correct".to_string()
            } else {
                format!("{} misses in a row", r.consecutive_incorrect)
            };
            println!("  {} on {}/{}: {reason}", r.student_id, r.schedule_item_id, r.block_id);
        }
    }
}
