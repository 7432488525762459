//! Editor error types.

use thiserror::Error;

/// Errors from editor operations that address something that does not exist.
///
/// Rejected-but-harmless actions (an illegal block kind, a missing template)
/// are not errors: the editor logs a warning and skips them.
#[derive(Debug, Error)]
pub enum EditorError {
    /// No block with this id.
    #[error("no block with id {0}")]
    UnknownBlock(String),

    /// The block's payload does not support this edit.
    #[error("block {block_id} is not a {expected} block")]
    WrongPayload {
        block_id: String,
        expected: &'static str,
    },

    /// The gap-fill block has no gap with this index.
    #[error("block {block_id} has no gap {index}")]
    UnknownGap { block_id: String, index: u32 },

    /// The multiple-choice block has no question with this id.
    #[error("block {block_id} has no question {question_id}")]
    UnknownQuestion {
        block_id: String,
        question_id: String,
    },

    /// The question has no option with this index.
    #[error("question {question_id} has no option {index}")]
    UnknownOption { question_id: String, index: u32 },

    /// `choose_insert_kind` without a preceding `begin_insert_above`.
    #[error("no insert is pending")]
    NoPendingInsert,

    /// The block already uses the largest gap index.
    #[error("block {0} has no free gap index left")]
    GapIndicesExhausted(String),
}

impl EditorError {
    /// Whether the error names a block, gap, question or option that does
    /// not exist.
    pub fn is_not_found(&self) -> bool {
        !matches!(
            self,
            EditorError::WrongPayload { .. }
                | EditorError::NoPendingInsert
                | EditorError::GapIndicesExhausted(_)
        )
    }
}
