//! The `coursekit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use coursekit_core::parser;

pub fn execute(document_path: PathBuf) -> Result<()> {
    let docs = if document_path.is_dir() {
        let docs = parser::load_document_directory(&document_path)?;
        if docs.is_empty() {
            anyhow::bail!("no content documents found in {}", document_path.display());
        }
        docs
    } else {
        let doc = parser::load_document_file(&document_path, None)?;
        vec![(document_path, doc)]
    };

    let mut total_warnings = 0;

    for (path, doc) in &docs {
        println!(
            "Document: {} ({}, {} blocks, {} points)",
            path.display(),
            doc.item_type,
            doc.blocks.len(),
            doc.total_points()
        );

        let warnings = parser::lint(doc);
        for w in &warnings {
            println!("  [{}] WARNING: {}", w.block_id, w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All documents valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
