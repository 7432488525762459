//! Statistics report: the read surface behind teacher dashboards.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::statistics::{BlockStatistics, RECENT_MISTAKE_THRESHOLD};

/// Per-row view with the derived flags filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBlockSummary {
    pub schedule_item_id: u64,
    pub block_id: String,
    pub student_id: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub consecutive_incorrect: u32,
    pub success_rate: f64,
    pub has_never_been_correct: bool,
    pub has_recent_mistakes: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl StudentBlockSummary {
    pub fn needs_attention(&self) -> bool {
        self.has_never_been_correct || self.has_recent_mistakes
    }
}

/// Aggregate over all students for one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAggregate {
    pub schedule_item_id: u64,
    pub block_id: String,
    pub students: usize,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Correct attempts over all attempts, as a percentage.
    pub success_rate: f64,
    /// Students who have attempted but never answered correctly.
    pub students_never_correct: usize,
}

/// Full statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub created_at: DateTime<Utc>,
    pub recent_mistake_threshold: u32,
    pub rows: Vec<StudentBlockSummary>,
    pub blocks: Vec<BlockAggregate>,
}

impl StatisticsReport {
    /// Build a report with the default recent-mistake threshold.
    pub fn from_rows(rows: &[BlockStatistics]) -> Self {
        Self::with_threshold(rows, RECENT_MISTAKE_THRESHOLD)
    }

    pub fn with_threshold(rows: &[BlockStatistics], threshold: u32) -> Self {
        let mut summaries: Vec<StudentBlockSummary> = rows
            .iter()
            .map(|r| StudentBlockSummary {
                schedule_item_id: r.schedule_item_id,
                block_id: r.block_id.clone(),
                student_id: r.student_id.clone(),
                total_attempts: r.total_attempts,
                correct_attempts: r.correct_attempts,
                consecutive_incorrect: r.consecutive_incorrect,
                success_rate: r.success_rate(),
                has_never_been_correct: r.has_never_been_correct(),
                has_recent_mistakes: r.has_recent_mistakes_at(threshold),
                last_attempt_at: r.last_attempt_at,
            })
            .collect();
        summaries.sort_by(|a, b| {
            (a.schedule_item_id, &a.block_id, &a.student_id)
                .cmp(&(b.schedule_item_id, &b.block_id, &b.student_id))
        });

        let mut grouped: BTreeMap<(u64, String), Vec<&BlockStatistics>> = BTreeMap::new();
        for r in rows {
            grouped
                .entry((r.schedule_item_id, r.block_id.clone()))
                .or_default()
                .push(r);
        }
        let blocks = grouped
            .into_iter()
            .map(|((schedule_item_id, block_id), group)| {
                let total_attempts: u32 = group.iter().map(|r| r.total_attempts).sum();
                let correct_attempts: u32 = group.iter().map(|r| r.correct_attempts).sum();
                let success_rate = if total_attempts == 0 {
                    0.0
                } else {
                    correct_attempts as f64 / total_attempts as f64 * 100.0
                };
                BlockAggregate {
                    schedule_item_id,
                    block_id,
                    students: group.len(),
                    total_attempts,
                    correct_attempts,
                    success_rate,
                    students_never_correct: group
                        .iter()
                        .filter(|r| r.has_never_been_correct())
                        .count(),
                }
            })
            .collect();

        Self {
            created_at: Utc::now(),
            recent_mistake_threshold: threshold,
            rows: summaries,
            blocks,
        }
    }

    /// Rows flagged as never correct or with recent mistakes.
    pub fn needs_attention(&self) -> Vec<&StudentBlockSummary> {
        self.rows.iter().filter(|r| r.needs_attention()).collect()
    }

    /// Save report as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Load report from JSON.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse report: {}", path.display()))
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} rows, {} blocks, {} need attention\n\n",
            self.rows.len(),
            self.blocks.len(),
            self.needs_attention().len()
        ));

        if !self.blocks.is_empty() {
            md.push_str("### Blocks\n\n");
            md.push_str("| Item | Block | Students | Attempts | Success | Never correct |\n");
            md.push_str("|------|-------|----------|----------|---------|---------------|\n");
            for b in &self.blocks {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {:.1}% | {} |\n",
                    b.schedule_item_id,
                    b.block_id,
                    b.students,
                    b.total_attempts,
                    b.success_rate,
                    b.students_never_correct
                ));
            }
            md.push('\n');
        }

        let attention = self.needs_attention();
        if !attention.is_empty() {
            md.push_str("### Needs attention\n\n");
            md.push_str("| Item | Block | Student | Attempts | Streak of misses | Reason |\n");
            md.push_str("|------|-------|---------|----------|------------------|--------|\n");
            for r in attention {
                let reason = if r.has_never_been_correct {
                    "never correct"
                } else {
                    "recent mistakes"
                };
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    r.schedule_item_id,
                    r.block_id,
                    r.student_id,
                    r.total_attempts,
                    r.consecutive_incorrect,
                    reason
                ));
            }
        }

        md
    }
}
