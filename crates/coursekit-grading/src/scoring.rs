//! Point allocation shared by all validators.

use serde::{Deserialize, Serialize};

use coursekit_core::model::{QuestionMeta, ScheduleItem};
use coursekit_core::traits::BlockValidationResult;

/// How points are awarded when only some parts of a block are correct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringMode {
    /// Points proportional to parts correct, rounded down.
    #[default]
    Proportional,
    /// Full points only when every part is correct.
    AllOrNothing,
}

impl std::str::FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "proportional" => Ok(ScoringMode::Proportional),
            "allornothing" => Ok(ScoringMode::AllOrNothing),
            other => Err(format!("unknown scoring mode: {other}")),
        }
    }
}

/// Points for `parts_correct` of `parts_total`, never above `max_points`.
pub fn award(parts_correct: u32, parts_total: u32, max_points: u32, mode: ScoringMode) -> u32 {
    if parts_total == 0 {
        return 0;
    }
    let parts_correct = parts_correct.min(parts_total);
    match mode {
        ScoringMode::AllOrNothing => {
            if parts_correct == parts_total {
                max_points
            } else {
                0
            }
        }
        ScoringMode::Proportional => {
            let points = u64::from(max_points) * u64::from(parts_correct) / u64::from(parts_total);
            // parts_correct <= parts_total keeps this within max_points.
            (points as u32).min(max_points)
        }
    }
}

/// Type-specific grading outcome before points are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub parts_correct: u32,
    pub parts_total: u32,
    pub correct_answer: serde_json::Value,
}

impl Grade {
    pub fn is_correct(&self) -> bool {
        self.parts_total > 0 && self.parts_correct == self.parts_total
    }

    /// Attach points and apply the item's "show solutions" flag.
    pub fn into_result(
        self,
        item: &ScheduleItem,
        meta: &QuestionMeta,
        mode: ScoringMode,
    ) -> BlockValidationResult {
        let max_points = meta.max_points();
        BlockValidationResult {
            is_correct: self.is_correct(),
            points_earned: award(self.parts_correct, self.parts_total, max_points, mode),
            max_points,
            parts_correct: self.parts_correct,
            parts_total: self.parts_total,
            correct_answer: item.show_solutions.then(|| self.correct_answer.clone()),
            correct_answer_snapshot: self.correct_answer,
        }
    }
}
