//! The `coursekit grade` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use coursekit_core::engine::SubmissionEngine;
use coursekit_core::parser;
use coursekit_grading::{build_registry, InMemoryContentStore, InMemoryStatisticsStore};

/// Schedule item id the document is registered under for a one-off grade.
const LOCAL_ITEM_ID: u64 = 1;

pub async fn execute(
    document_path: PathBuf,
    block_id: String,
    answer: String,
    show_solutions: bool,
    student_id: String,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = coursekit_grading::load_config_from(config_path.as_deref())?;
    let doc = parser::load_document_file(&document_path, None)?;
    let submitted: serde_json::Value =
        serde_json::from_str(&answer).context("--answer is not valid JSON")?;

    let content = Arc::new(InMemoryContentStore::new());
    content.insert_document(LOCAL_ITEM_ID, &doc, show_solutions);
    let engine = SubmissionEngine::new(
        build_registry(&config, content.clone()),
        content,
        Arc::new(InMemoryStatisticsStore::new()),
        config.engine_config(),
    );

    let outcome = engine
        .submit(LOCAL_ITEM_ID, &block_id, &student_id, submitted)
        .await
        .with_context(|| format!("failed to grade block {block_id}"))?;
    let result = &outcome.result;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        _ => {
            println!(
                "{} ({}/{} points, {}/{} parts)",
                if result.is_correct { "Correct" } else { "Incorrect" },
                result.points_earned,
                result.max_points,
                result.parts_correct,
                result.parts_total
            );
            if let Some(correct) = &result.correct_answer {
                println!("Correct answer: {correct}");
            }
        }
    }

    Ok(())
}
