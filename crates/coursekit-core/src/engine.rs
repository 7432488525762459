//! Central submission engine.
//!
//! Dispatches a submission to the validator registered for the schedule
//! item's type, folds the resulting attempt into the per-(item, block,
//! student) statistics row with optimistic concurrency, and appends it to the
//! attempt log once the row is committed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{StoreError, SubmitError, ValidationError};
use crate::model::ItemType;
use crate::statistics::{BlockAttempt, BlockStatistics, StatisticsKey};
use crate::traits::{BlockValidationResult, BlockValidator, ContentStore, StatisticsStore};

/// Configuration for the submission engine.
#[derive(Debug, Clone)]
pub struct SubmissionEngineConfig {
    /// Retries after a statistics version conflict before giving up.
    pub max_conflict_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub retry_delay: Duration,
    /// Upper bound for the retry delay.
    pub max_retry_delay: Duration,
}

impl Default for SubmissionEngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
            retry_delay: Duration::from_millis(10),
            max_retry_delay: Duration::from_secs(1),
        }
    }
}

/// Validators keyed by the item type they grade.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<ItemType, Arc<dyn BlockValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under its own `supported_type`, replacing any
    /// previous one.
    pub fn register(&mut self, validator: Arc<dyn BlockValidator>) {
        self.validators.insert(validator.supported_type(), validator);
    }

    pub fn with(mut self, validator: Arc<dyn BlockValidator>) -> Self {
        self.register(validator);
        self
    }

    pub fn get(&self, item_type: ItemType) -> Option<&Arc<dyn BlockValidator>> {
        self.validators.get(&item_type)
    }

    /// Item types with a registered validator, sorted.
    pub fn supported_types(&self) -> Vec<ItemType> {
        let mut types: Vec<ItemType> = self.validators.keys().copied().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("supported_types", &self.supported_types())
            .finish()
    }
}

/// Everything produced by one submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub result: BlockValidationResult,
    pub attempt: BlockAttempt,
    pub statistics: BlockStatistics,
}

/// The central submission engine.
pub struct SubmissionEngine {
    validators: ValidatorRegistry,
    content: Arc<dyn ContentStore>,
    statistics: Arc<dyn StatisticsStore>,
    config: SubmissionEngineConfig,
}

impl SubmissionEngine {
    pub fn new(
        validators: ValidatorRegistry,
        content: Arc<dyn ContentStore>,
        statistics: Arc<dyn StatisticsStore>,
        config: SubmissionEngineConfig,
    ) -> Self {
        Self {
            validators,
            content,
            statistics,
            config,
        }
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Grade a submission without recording it.
    pub async fn validate(
        &self,
        schedule_item_id: u64,
        block_id: &str,
        submitted_answer: &serde_json::Value,
    ) -> Result<BlockValidationResult, ValidationError> {
        let item = self
            .content
            .schedule_item(schedule_item_id)
            .await?
            .ok_or(ValidationError::ItemNotFound(schedule_item_id))?;

        let Some(validator) = self.validators.get(item.item_type) else {
            return Err(ValidationError::UnsupportedItemType(item.item_type));
        };

        tracing::debug!(
            schedule_item_id,
            block_id,
            item_type = %item.item_type,
            "dispatching submission to validator"
        );
        validator
            .validate(schedule_item_id, block_id, submitted_answer)
            .await
    }

    /// Grade a submission, append the attempt and update statistics.
    ///
    /// Nothing is recorded when validation fails.
    pub async fn submit(
        &self,
        schedule_item_id: u64,
        block_id: &str,
        student_id: &str,
        submitted_answer: serde_json::Value,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let result = self
            .validate(schedule_item_id, block_id, &submitted_answer)
            .await?;

        let key = StatisticsKey::new(schedule_item_id, block_id, student_id);
        let attempt = BlockAttempt::new(
            &key,
            submitted_answer,
            result.correct_answer_snapshot.clone(),
            result.is_correct,
            result.points_earned,
            result.max_points,
            Utc::now(),
        );

        let statistics = self.record(&attempt).await?;

        tracing::info!(
            schedule_item_id,
            block_id,
            student_id,
            is_correct = result.is_correct,
            points = result.points_earned,
            max_points = result.max_points,
            "recorded attempt"
        );

        Ok(SubmissionOutcome {
            result,
            attempt,
            statistics,
        })
    }

    /// Fold an attempt into its statistics row, then append it to the log.
    ///
    /// The log only ever holds attempts whose fold was committed, so a
    /// surfaced [`SubmitError::ConcurrencyConflict`] records nothing.
    pub async fn record(&self, attempt: &BlockAttempt) -> Result<BlockStatistics, SubmitError> {
        let row = self
            .fold_into_row(&attempt.key(), attempt.is_correct, attempt.attempted_at)
            .await?;
        self.statistics
            .append_attempt(attempt)
            .await
            .map_err(SubmitError::Store)?;
        Ok(row)
    }

    /// Read-modify-write of one statistics row, retried on version conflicts
    /// with exponential backoff.
    async fn fold_into_row(
        &self,
        key: &StatisticsKey,
        is_correct: bool,
        attempted_at: DateTime<Utc>,
    ) -> Result<BlockStatistics, SubmitError> {
        let mut retry_delay = self.config.retry_delay;
        for retry in 0..=self.config.max_conflict_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(self.config.max_retry_delay);
            }

            let current = self
                .statistics
                .statistics(key)
                .await
                .map_err(SubmitError::Store)?
                .unwrap_or_else(|| BlockStatistics::new(key));
            let expected_version = current.version;
            let next = current.record_attempt(is_correct, attempted_at);

            match self.statistics.compare_and_swap(next, expected_version).await {
                Ok(stored) => return Ok(stored),
                Err(e @ StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        block_id = %key.block_id,
                        student_id = %key.student_id,
                        retry,
                        "statistics row changed underneath us: {e}"
                    );
                }
                Err(e) => return Err(SubmitError::Store(e)),
            }
        }

        tracing::warn!(
            block_id = %key.block_id,
            student_id = %key.student_id,
            "giving up on statistics update after {} attempts",
            self.config.max_conflict_retries + 1
        );
        Err(SubmitError::ConcurrencyConflict {
            block_id: key.block_id.clone(),
            attempts: self.config.max_conflict_retries + 1,
        })
    }
}
