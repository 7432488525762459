//! The `coursekit init` command.

use std::path::Path;

use anyhow::{Context, Result};

use coursekit_core::model::{BlockKind, ContentDocument, ItemType};
use coursekit_core::parser;
use coursekit_editor::BlockEditor;

pub fn execute() -> Result<()> {
    if Path::new("coursekit.toml").exists() {
        println!("coursekit.toml already exists, skipping.");
    } else {
        std::fs::write("coursekit.toml", SAMPLE_CONFIG)?;
        println!("Created coursekit.toml");
    }

    std::fs::create_dir_all("content")?;
    let example_path = Path::new("content/example.json");
    if example_path.exists() {
        println!("content/example.json already exists, skipping.");
    } else {
        let doc = example_document()?;
        std::fs::write(example_path, format!("{}\n", parser::serialize_pretty(&doc)))?;
        println!("Created content/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: coursekit validate --document content/example.json");
    println!(
        "  2. Run: coursekit grade --document content/example.json --block block-2 --answer '{{\"answers\": [\"blue\"]}}'"
    );

    Ok(())
}

/// A short gap-fill lesson, authored through the editor.
fn example_document() -> Result<ContentDocument> {
    let mut editor = BlockEditor::new(ItemType::GapFill);
    let intro = editor
        .add_block(BlockKind::Text)
        .context("text blocks are always available")?;
    editor.update_content(&intro, "Fill in the missing colour.")?;

    let question = editor
        .add_block(BlockKind::QuestionText)
        .context("gap-fill documents accept question text blocks")?;
    editor.update_content(&question, "On a clear day the sky is ")?;
    let blank = editor.insert_blank(&question)?;
    editor.set_gap_answer(&question, blank, "blue")?;
    editor.set_gap_alternatives(&question, blank, vec!["azure".into()])?;
    editor.set_gap_hint(&question, blank, "Look up")?;
    editor.set_points(&question, 2)?;

    Ok(editor.to_document())
}

const SAMPLE_CONFIG: &str = r#"# coursekit configuration

[grading]
# "proportional" awards points per correct gap or question;
# "allOrNothing" awards full points only when everything is correct.
scoring = "proportional"
max_conflict_retries = 5
retry_delay_ms = 10

[attention]
recent_mistake_threshold = 3
"#;
