//! Attempt records and rolling per-block statistics.
//!
//! Every graded submission becomes an immutable [`BlockAttempt`]. Attempts
//! are folded one at a time into a [`BlockStatistics`] row per
//! (schedule item, block, student).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consecutive misses at which a student "has recent mistakes".
pub const RECENT_MISTAKE_THRESHOLD: u32 = 3;

/// Identity of a statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsKey {
    pub schedule_item_id: u64,
    pub block_id: String,
    pub student_id: String,
}

impl StatisticsKey {
    pub fn new(schedule_item_id: u64, block_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            schedule_item_id,
            block_id: block_id.into(),
            student_id: student_id.into(),
        }
    }
}

/// One student's submission against one block. Never modified once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAttempt {
    pub id: Uuid,
    pub schedule_item_id: u64,
    pub block_id: String,
    pub student_id: String,
    pub submitted_answer: serde_json::Value,
    /// What counted as correct at grading time.
    pub correct_answer_snapshot: serde_json::Value,
    pub is_correct: bool,
    pub points_earned: u32,
    pub max_points: u32,
    pub attempted_at: DateTime<Utc>,
}

impl BlockAttempt {
    /// Build an attempt. `points_earned` is clamped to `max_points`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: &StatisticsKey,
        submitted_answer: serde_json::Value,
        correct_answer_snapshot: serde_json::Value,
        is_correct: bool,
        points_earned: u32,
        max_points: u32,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_item_id: key.schedule_item_id,
            block_id: key.block_id.clone(),
            student_id: key.student_id.clone(),
            submitted_answer,
            correct_answer_snapshot,
            is_correct,
            points_earned: points_earned.min(max_points),
            max_points,
            attempted_at,
        }
    }

    pub fn key(&self) -> StatisticsKey {
        StatisticsKey::new(self.schedule_item_id, &self.block_id, &self.student_id)
    }
}

/// Rolling aggregate of all attempts for one (item, block, student).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatistics {
    pub schedule_item_id: u64,
    pub block_id: String,
    pub student_id: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub incorrect_attempts: u32,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
    pub first_attempt_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_correct_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful write.
    #[serde(default)]
    pub version: u64,
}

impl BlockStatistics {
    /// A fresh row with no attempts.
    pub fn new(key: &StatisticsKey) -> Self {
        Self {
            schedule_item_id: key.schedule_item_id,
            block_id: key.block_id.clone(),
            student_id: key.student_id.clone(),
            total_attempts: 0,
            correct_attempts: 0,
            incorrect_attempts: 0,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            first_attempt_at: None,
            last_attempt_at: None,
            last_correct_at: None,
            version: 0,
        }
    }

    pub fn key(&self) -> StatisticsKey {
        StatisticsKey::new(self.schedule_item_id, &self.block_id, &self.student_id)
    }

    /// Fold one attempt outcome into the row.
    ///
    /// Pure: returns the updated row and leaves `self` untouched. The
    /// `version` is carried over; stores bump it on write.
    pub fn record_attempt(&self, is_correct: bool, attempted_at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.total_attempts += 1;
        if is_correct {
            next.correct_attempts += 1;
            next.consecutive_correct += 1;
            next.consecutive_incorrect = 0;
            next.last_correct_at = Some(attempted_at);
        } else {
            next.incorrect_attempts += 1;
            next.consecutive_incorrect += 1;
            next.consecutive_correct = 0;
        }
        next.first_attempt_at.get_or_insert(attempted_at);
        next.last_attempt_at = Some(attempted_at);
        next
    }

    /// Percentage of correct attempts, 0 when there are none.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.correct_attempts as f64 / self.total_attempts as f64 * 100.0
    }

    pub fn has_never_been_correct(&self) -> bool {
        self.total_attempts > 0 && self.correct_attempts == 0
    }

    pub fn has_recent_mistakes(&self) -> bool {
        self.has_recent_mistakes_at(RECENT_MISTAKE_THRESHOLD)
    }

    pub fn has_recent_mistakes_at(&self, threshold: u32) -> bool {
        self.consecutive_incorrect >= threshold
    }
}

/// Fold a whole attempt log into statistics rows, in attempt-time order.
pub fn fold_attempts(attempts: &[BlockAttempt]) -> Vec<BlockStatistics> {
    let mut ordered: Vec<&BlockAttempt> = attempts.iter().collect();
    ordered.sort_by_key(|a| a.attempted_at);

    let mut rows: std::collections::BTreeMap<StatisticsKey, BlockStatistics> =
        std::collections::BTreeMap::new();
    for attempt in ordered {
        let key = attempt.key();
        let row = rows
            .entry(key.clone())
            .or_insert_with(|| BlockStatistics::new(&key));
        *row = row.record_attempt(attempt.is_correct, attempt.attempted_at);
    }
    rows.into_values().collect()
}
