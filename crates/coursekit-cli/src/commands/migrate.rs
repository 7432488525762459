//! The `coursekit migrate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use coursekit_core::model::ItemType;
use coursekit_core::parser;

pub fn execute(document_path: PathBuf, item_type: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let fallback = item_type
        .map(|t| t.parse::<ItemType>().map_err(anyhow::Error::msg))
        .transpose()?;

    let doc = parser::load_document_file(&document_path, fallback)?;
    let json = parser::serialize_pretty(&doc);

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("failed to write document: {}", path.display()))?;
            println!(
                "Wrote {} ({}, {} blocks)",
                path.display(),
                doc.item_type,
                doc.blocks.len()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
