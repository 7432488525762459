//! In-memory stores for tests, the CLI and embedding without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;

use coursekit_core::error::StoreError;
use coursekit_core::model::{ContentDocument, ScheduleItem};
use coursekit_core::parser;
use coursekit_core::statistics::{BlockAttempt, BlockStatistics, StatisticsKey};
use coursekit_core::traits::{ContentStore, StatisticsStore};

/// Schedule items held in a map.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    items: RwLock<HashMap<u64, ScheduleItem>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a schedule item.
    pub fn insert(&self, item: ScheduleItem) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(item.id, item);
    }

    /// Store `doc` as the content of schedule item `id`.
    pub fn insert_document(&self, id: u64, doc: &ContentDocument, show_solutions: bool) {
        self.insert(ScheduleItem {
            id,
            item_type: doc.item_type,
            show_solutions,
            content: parser::serialize(doc),
        });
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn schedule_item(&self, id: u64) -> Result<Option<ScheduleItem>, StoreError> {
        let items = self
            .items
            .read()
            .map_err(|_| StoreError::Backend("content store lock poisoned".into()))?;
        Ok(items.get(&id).cloned())
    }
}

/// Attempt log and statistics rows behind mutexes.
///
/// `compare_and_swap` checks and writes under one lock, so concurrent
/// submitters observe a version conflict instead of a lost update.
#[derive(Debug, Default)]
pub struct InMemoryStatisticsStore {
    attempts: Mutex<Vec<BlockAttempt>>,
    rows: Mutex<HashMap<StatisticsKey, BlockStatistics>>,
}

impl InMemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the attempt log, oldest first.
    pub fn attempts(&self) -> Vec<BlockAttempt> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Copy of every statistics row.
    pub fn rows(&self) -> Vec<BlockStatistics> {
        self.rows
            .lock()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock_rows(&self) -> Result<MutexGuard<'_, HashMap<StatisticsKey, BlockStatistics>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Backend("statistics store lock poisoned".into()))
    }
}

#[async_trait]
impl StatisticsStore for InMemoryStatisticsStore {
    async fn append_attempt(&self, attempt: &BlockAttempt) -> Result<(), StoreError> {
        self.attempts
            .lock()
            .map_err(|_| StoreError::Backend("attempt log lock poisoned".into()))?
            .push(attempt.clone());
        Ok(())
    }

    async fn statistics(&self, key: &StatisticsKey) -> Result<Option<BlockStatistics>, StoreError> {
        Ok(self.lock_rows()?.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        mut row: BlockStatistics,
        expected_version: u64,
    ) -> Result<BlockStatistics, StoreError> {
        let mut rows = self.lock_rows()?;
        let key = row.key();
        let found = rows.get(&key).map(|r| r.version).unwrap_or(0);
        if found != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found,
            });
        }
        row.version = expected_version + 1;
        rows.insert(key, row.clone());
        Ok(row)
    }

    async fn statistics_for_item(&self, schedule_item_id: u64) -> Result<Vec<BlockStatistics>, StoreError> {
        let mut rows: Vec<BlockStatistics> = self
            .lock_rows()?
            .values()
            .filter(|r| r.schedule_item_id == schedule_item_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.block_id, &a.student_id).cmp(&(&b.block_id, &b.student_id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use coursekit_core::engine::{SubmissionEngine, SubmissionEngineConfig, ValidatorRegistry};
    use coursekit_core::model::{
        Block, BlockData, BlockKind, ChoiceMode, ChoiceOption, ChoiceQuestion, ItemType,
        MultipleChoicePayload,
    };

    use crate::multiple_choice::MultipleChoiceValidator;

    fn key() -> StatisticsKey {
        StatisticsKey::new(3, "block-1", "student-1")
    }

    #[tokio::test]
    async fn cas_rejects_stale_versions() {
        let store = InMemoryStatisticsStore::new();
        let fresh = BlockStatistics::new(&key()).record_attempt(true, Utc::now());

        let stored = store.compare_and_swap(fresh.clone(), 0).await.unwrap();
        assert_eq!(stored.version, 1);

        let err = store.compare_and_swap(fresh, 0).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 0,
                found: 1
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn rows_are_listed_per_item() {
        let store = InMemoryStatisticsStore::new();
        for (item, student) in [(3, "b"), (3, "a"), (4, "a")] {
            let row = BlockStatistics::new(&StatisticsKey::new(item, "block-1", student));
            store.compare_and_swap(row, 0).await.unwrap();
        }
        let rows = store.statistics_for_item(3).await.unwrap();
        let students: Vec<&str> = rows.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(students, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn content_store_roundtrip() {
        let store = InMemoryContentStore::new();
        assert!(store.is_empty());
        let doc = ContentDocument::new(ItemType::Reminder);
        store.insert_document(12, &doc, false);

        let item = store.schedule_item(12).await.unwrap().unwrap();
        assert_eq!(item.item_type, ItemType::Reminder);
        assert_eq!(parser::parse(&item.content).unwrap(), doc);
        assert!(store.schedule_item(13).await.unwrap().is_none());
    }

    fn quiz() -> ContentDocument {
        ContentDocument {
            item_type: ItemType::MultipleChoice,
            blocks: vec![Block {
                id: "block-1".into(),
                kind: BlockKind::QuestionText,
                order: 0,
                data: BlockData::MultipleChoice(MultipleChoicePayload {
                    questions: vec![ChoiceQuestion {
                        id: "q1".into(),
                        stem: "Capital of France?".into(),
                        answer_type: ChoiceMode::Single,
                        randomize: false,
                        options: vec![
                            ChoiceOption {
                                index: 0,
                                text: "Paris".into(),
                                correct: true,
                            },
                            ChoiceOption {
                                index: 1,
                                text: "Lyon".into(),
                                correct: false,
                            },
                        ],
                    }],
                    meta: Default::default(),
                }),
            }],
        }
    }

    /// Yields between reading a row and the compare-and-swap that follows, so
    /// joined submissions interleave. Counts the conflicts it reports.
    #[derive(Default)]
    struct YieldingStore {
        inner: InMemoryStatisticsStore,
        conflicts: std::sync::atomic::AtomicU32,
    }

    impl YieldingStore {
        fn conflicts(&self) -> u32 {
            self.conflicts.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatisticsStore for YieldingStore {
        async fn append_attempt(&self, attempt: &BlockAttempt) -> Result<(), StoreError> {
            self.inner.append_attempt(attempt).await
        }

        async fn statistics(&self, key: &StatisticsKey) -> Result<Option<BlockStatistics>, StoreError> {
            let row = self.inner.statistics(key).await;
            tokio::task::yield_now().await;
            row
        }

        async fn compare_and_swap(
            &self,
            row: BlockStatistics,
            expected_version: u64,
        ) -> Result<BlockStatistics, StoreError> {
            let result = self.inner.compare_and_swap(row, expected_version).await;
            if result.is_err() {
                self.conflicts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            result
        }

        async fn statistics_for_item(&self, schedule_item_id: u64) -> Result<Vec<BlockStatistics>, StoreError> {
            self.inner.statistics_for_item(schedule_item_id).await
        }
    }

    fn racing_engine(stats: Arc<YieldingStore>, max_conflict_retries: u32) -> SubmissionEngine {
        let content = Arc::new(InMemoryContentStore::new());
        content.insert_document(3, &quiz(), false);
        let registry =
            ValidatorRegistry::new().with(Arc::new(MultipleChoiceValidator::new(content.clone())));
        SubmissionEngine::new(
            registry,
            content,
            stats,
            SubmissionEngineConfig {
                max_conflict_retries,
                ..Default::default()
            },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_submissions_both_count() {
        let stats = Arc::new(YieldingStore::default());
        let engine = racing_engine(stats.clone(), 5);

        let (first, second) = tokio::join!(
            engine.submit(3, "block-1", "student-1", serde_json::json!({"selected": [0]})),
            engine.submit(3, "block-1", "student-1", serde_json::json!({"selected": [1]})),
        );
        first.unwrap();
        second.unwrap();

        // Both read version 0 before either wrote.
        assert!(stats.conflicts() >= 1);
        let row = stats.statistics(&key()).await.unwrap().unwrap();
        assert_eq!(row.total_attempts, 2);
        assert_eq!(row.correct_attempts, 1);
        assert_eq!(row.incorrect_attempts, 1);
        assert_eq!(row.version, 2);
        assert_eq!(stats.inner.attempts().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_across_tasks() {
        let stats = Arc::new(YieldingStore::default());
        let engine = Arc::new(racing_engine(stats.clone(), 50));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .submit(3, "block-1", "student-1", serde_json::json!({"selected": i % 2}))
                        .await
                })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let row = stats.statistics(&key()).await.unwrap().unwrap();
        assert_eq!(row.total_attempts, 8);
        assert_eq!(row.correct_attempts, 4);
        assert_eq!(row.version, 8);
        assert_eq!(
            coursekit_core::statistics::fold_attempts(&stats.inner.attempts())[0].total_attempts,
            8
        );
    }
}
