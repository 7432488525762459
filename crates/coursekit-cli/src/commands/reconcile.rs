//! The `coursekit reconcile` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use coursekit_core::model::BlockData;
use coursekit_core::parser;
use coursekit_editor::{BlockEditor, EditorEvent};

pub fn execute(document_path: PathBuf, write: bool) -> Result<()> {
    let doc = parser::load_document_file(&document_path, None)?;
    let mut editor = BlockEditor::new(doc.item_type);
    editor.load(doc);

    // Replaying each gap-fill block's content through the editor reconciles it.
    let contents: Vec<(String, String)> = editor
        .blocks()
        .iter()
        .filter_map(|b| match &b.data {
            BlockData::GapFill(p) => Some((b.id.clone(), p.content.clone())),
            _ => None,
        })
        .collect();
    for (id, content) in contents {
        editor.update_content(&id, content)?;
    }

    let changed: Vec<(String, Vec<u32>)> = editor
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            EditorEvent::GapsReconciled { block_id, indices } => Some((block_id, indices)),
            _ => None,
        })
        .collect();

    if changed.is_empty() {
        println!("All gap-fill blocks already reconciled.");
        return Ok(());
    }

    for (block_id, indices) in &changed {
        let indices: Vec<String> = indices.iter().map(u32::to_string).collect();
        println!("  [{block_id}] gaps now: [{}]", indices.join(", "));
    }

    if write {
        let json = parser::serialize_pretty(&editor.to_document());
        std::fs::write(&document_path, format!("{json}\n"))
            .with_context(|| format!("failed to write document: {}", document_path.display()))?;
        println!("Updated {}", document_path.display());
    } else {
        println!("\n{} block(s) out of sync. Re-run with --write to update the file.", changed.len());
    }

    Ok(())
}
