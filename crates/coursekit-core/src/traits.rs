//! Core trait definitions for persistence collaborators and answer validators.
//!
//! The stores are implemented in `coursekit-grading` (in memory) or by the
//! host application; validators are implemented per item type in
//! `coursekit-grading`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, ValidationError};
use crate::model::{ItemType, ScheduleItem};
use crate::statistics::{BlockAttempt, BlockStatistics, StatisticsKey};

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Source of persisted schedule items and their content documents.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a schedule item, or `None` if it does not exist.
    async fn schedule_item(&self, id: u64) -> Result<Option<ScheduleItem>, StoreError>;
}

/// Append-only attempt log plus versioned statistics rows.
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Append an attempt to the log.
    async fn append_attempt(&self, attempt: &BlockAttempt) -> Result<(), StoreError>;

    /// Read a statistics row.
    async fn statistics(&self, key: &StatisticsKey) -> Result<Option<BlockStatistics>, StoreError>;

    /// Write `row` only if the stored version still equals `expected_version`
    /// (0 for a row that does not exist yet). Returns the row as stored, with
    /// its version bumped.
    async fn compare_and_swap(
        &self,
        row: BlockStatistics,
        expected_version: u64,
    ) -> Result<BlockStatistics, StoreError>;

    /// All rows for a schedule item, for teacher dashboards.
    async fn statistics_for_item(&self, schedule_item_id: u64) -> Result<Vec<BlockStatistics>, StoreError>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Grades submissions for one item type.
#[async_trait]
pub trait BlockValidator: Send + Sync {
    /// The item type this validator grades.
    fn supported_type(&self) -> ItemType;

    /// Validate `submitted_answer` against block `block_id` of schedule item
    /// `schedule_item_id`.
    async fn validate(
        &self,
        schedule_item_id: u64,
        block_id: &str,
        submitted_answer: &serde_json::Value,
    ) -> Result<BlockValidationResult, ValidationError>;
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockValidationResult {
    /// All parts correct.
    pub is_correct: bool,
    pub points_earned: u32,
    pub max_points: u32,
    /// Gaps or questions answered correctly.
    pub parts_correct: u32,
    pub parts_total: u32,
    /// Only present when the schedule item shows solutions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<serde_json::Value>,
    /// Always filled; stored with the attempt even when hidden from students.
    #[serde(skip)]
    pub correct_answer_snapshot: serde_json::Value,
}
