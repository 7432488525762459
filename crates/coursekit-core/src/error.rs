//! Error types for content documents, answer validation and statistics stores.
//!
//! Defined in `coursekit-core` so callers can classify failures (not found,
//! malformed answer, retryable conflict) without string matching.

use thiserror::Error;

use crate::model::{BlockKind, ItemType};

/// A content document that cannot be migrated or parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The raw text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value matches no known document shape.
    #[error("unrecognized document shape: {0}")]
    UnrecognizedShape(String),

    /// The document has no `itemType` and none was supplied by the caller.
    #[error("document has no itemType and no fallback was given")]
    MissingItemType,

    /// The `itemType` tag is not a known item type.
    #[error("unknown item type: {0}")]
    UnknownItemType(String),

    /// A block's `type` tag is not a known block kind.
    #[error("block '{block_id}' has unknown type '{kind}'")]
    UnknownBlockKind { block_id: String, kind: String },

    /// A block kind that is not allowed for the document's item type.
    #[error("block '{block_id}' of type {kind} is not allowed in a {item_type} document")]
    IllegalBlockKind {
        block_id: String,
        kind: BlockKind,
        item_type: ItemType,
    },

    /// Two blocks share the same id.
    #[error("duplicate block id: {0}")]
    DuplicateBlockId(String),

    /// Block `order` values are not exactly `0..n` in sequence.
    #[error("block '{block_id}' has order {found}, expected {expected}")]
    NonContiguousOrder {
        block_id: String,
        expected: usize,
        found: i64,
    },

    /// A block is missing a required field.
    #[error("block at position {position} is missing field '{field}'")]
    MissingField { position: usize, field: &'static str },

    /// A block's `data` does not deserialize into the payload for its kind.
    #[error("block '{block_id}' has an invalid payload: {source}")]
    InvalidPayload {
        block_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A compare-and-swap lost against a concurrent writer.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` if the operation may succeed when re-read and retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Errors reported by a block validator.
///
/// None of these are ever converted into an "incorrect" grade.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The schedule item does not exist.
    #[error("schedule item {0} not found")]
    ItemNotFound(u64),

    /// The schedule item exists but has no block with this id.
    #[error("block '{block_id}' not found in schedule item {schedule_item_id}")]
    BlockNotFound {
        schedule_item_id: u64,
        block_id: String,
    },

    /// The submission does not have the shape the block expects.
    #[error("invalid answer format: {0}")]
    InvalidAnswerFormat(String),

    /// The block carries no gradable question for this validator.
    #[error("block '{block_id}' is not gradable: {reason}")]
    NotGradable { block_id: String, reason: String },

    /// No validator is registered for the item type.
    #[error("no validator registered for item type {0}")]
    UnsupportedItemType(ItemType),

    /// The stored content document could not be loaded.
    #[error("stored content is invalid: {0}")]
    Content(#[from] ParseError),

    /// The content store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidationError {
    /// Returns `true` for unknown items and unknown blocks.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ValidationError::ItemNotFound(_) | ValidationError::BlockNotFound { .. }
        )
    }
}

/// Errors from the full submit flow (validate, then record).
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Validation failed; nothing was recorded.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The statistics row kept changing underneath us. The attempt was not
    /// recorded and may be resubmitted.
    #[error("statistics update for block '{block_id}' conflicted {attempts} times; attempt not recorded")]
    ConcurrencyConflict { block_id: String, attempts: u32 },

    /// The statistics store failed for a non-retryable reason.
    #[error(transparent)]
    Store(StoreError),
}
