//! Change notifications emitted by the editor.

use serde::Serialize;

use coursekit_core::model::BlockKind;

/// A document change made in editing mode. Hosts drain these with
/// [`BlockEditor::take_events`](crate::BlockEditor::take_events) to schedule
/// autosaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    #[serde(rename_all = "camelCase")]
    BlockAdded { block_id: String, kind: BlockKind },
    #[serde(rename_all = "camelCase")]
    BlockMoved {
        block_id: String,
        from: usize,
        to: usize,
    },
    #[serde(rename_all = "camelCase")]
    BlockDeleted { block_id: String },
    /// Any payload edit.
    #[serde(rename_all = "camelCase")]
    BlockChanged { block_id: String },
    /// A content edit changed the set of gaps.
    #[serde(rename_all = "camelCase")]
    GapsReconciled { block_id: String, indices: Vec<u32> },
}

impl EditorEvent {
    pub fn block_id(&self) -> &str {
        match self {
            EditorEvent::BlockAdded { block_id, .. }
            | EditorEvent::BlockMoved { block_id, .. }
            | EditorEvent::BlockDeleted { block_id }
            | EditorEvent::BlockChanged { block_id }
            | EditorEvent::GapsReconciled { block_id, .. } => block_id,
        }
    }
}
