//! Gap-fill validator.
//!
//! Accepted submissions:
//! - `{"answers": ["blue", "green"]}`: one entry per gap, in gap order
//! - `{"answers": {"1": "blue", "2": "green"}}`: keyed by gap index; a
//!   missing index counts as unanswered, and keys such as `"01"` name the
//!   same gap as `"1"`
//!
//! Answer values may be strings, numbers or `null` (unanswered).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use coursekit_core::error::ValidationError;
use coursekit_core::model::{BlockData, Gap, GapAnswerType, GapFillPayload, ItemType};
use coursekit_core::traits::{BlockValidationResult, BlockValidator, ContentStore};

use crate::lookup::{load_block, not_gradable};
use crate::scoring::{Grade, ScoringMode};

const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Grades gap-fill blocks.
pub struct GapFillValidator {
    content: Arc<dyn ContentStore>,
    scoring: ScoringMode,
}

impl GapFillValidator {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self {
            content,
            scoring: ScoringMode::default(),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringMode) -> Self {
        self.scoring = scoring;
        self
    }
}

#[async_trait]
impl BlockValidator for GapFillValidator {
    fn supported_type(&self) -> ItemType {
        ItemType::GapFill
    }

    async fn validate(
        &self,
        schedule_item_id: u64,
        block_id: &str,
        submitted_answer: &Value,
    ) -> Result<BlockValidationResult, ValidationError> {
        let (item, block) = load_block(self.content.as_ref(), schedule_item_id, block_id).await?;
        let BlockData::GapFill(payload) = &block.data else {
            return Err(not_gradable(&block, "not a gap-fill question"));
        };

        let grade = grade(payload, submitted_answer)?;
        if grade.parts_total == 0 {
            tracing::warn!(schedule_item_id, block_id, "gap-fill block has no gaps to grade");
        }
        Ok(grade.into_result(&item, &payload.meta, self.scoring))
    }
}

/// Grade a submission against a gap-fill payload.
pub fn grade(payload: &GapFillPayload, submitted: &Value) -> Result<Grade, ValidationError> {
    let answers = submitted_answers(payload, submitted)?;

    let parts_correct = payload
        .gaps
        .iter()
        .zip(&answers)
        .filter(|(gap, given)| {
            given
                .as_deref()
                .is_some_and(|g| gap_matches(gap, g, payload.answer_type, payload.case_sensitive))
        })
        .count() as u32;

    Ok(Grade {
        parts_correct,
        parts_total: payload.gaps.len() as u32,
        correct_answer: correct_answer(payload),
    })
}

/// `{"answers": {"<index>": [correct, ...alternatives]}}`
pub fn correct_answer(payload: &GapFillPayload) -> Value {
    let answers: Map<String, Value> = payload
        .gaps
        .iter()
        .map(|gap| {
            let accepted: Vec<Value> = gap
                .accepted_answers()
                .filter(|a| !a.trim().is_empty())
                .map(|a| Value::String(a.to_string()))
                .collect();
            (gap.index.to_string(), Value::Array(accepted))
        })
        .collect();
    serde_json::json!({ "answers": answers })
}

/// Submitted answers aligned with `payload.gaps`; `None` is unanswered.
fn submitted_answers(
    payload: &GapFillPayload,
    submitted: &Value,
) -> Result<Vec<Option<String>>, ValidationError> {
    let answers = submitted
        .get("answers")
        .ok_or_else(|| malformed("expected an object with an `answers` field"))?;

    match answers {
        Value::Array(list) => {
            if list.len() != payload.gaps.len() {
                return Err(malformed(format!(
                    "expected {} answers, got {}",
                    payload.gaps.len(),
                    list.len()
                )));
            }
            list.iter().map(answer_text).collect()
        }
        Value::Object(keyed) => {
            let mut by_index: HashMap<u32, &Value> = HashMap::with_capacity(keyed.len());
            for (key, value) in keyed {
                let index = key
                    .parse::<u32>()
                    .ok()
                    .filter(|index| payload.gap(*index).is_some())
                    .ok_or_else(|| malformed(format!("`{key}` is not a gap index of this block")))?;
                if by_index.insert(index, value).is_some() {
                    return Err(malformed(format!("gap {index} is answered more than once")));
                }
            }
            payload
                .gaps
                .iter()
                .map(|gap| match by_index.get(&gap.index) {
                    Some(value) => answer_text(value),
                    None => Ok(None),
                })
                .collect()
        }
        _ => Err(malformed("`answers` must be a list or an object keyed by gap index")),
    }
}

fn answer_text(value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        other => Err(malformed(format!("gap answers must be text, got {other}"))),
    }
}

fn malformed(message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidAnswerFormat(message.into())
}

/// Does `given` match the gap's correct answer or any alternative?
pub fn gap_matches(gap: &Gap, given: &str, answer_type: GapAnswerType, case_sensitive: bool) -> bool {
    if given.trim().is_empty() {
        return false;
    }
    gap.accepted_answers()
        .filter(|expected| !expected.trim().is_empty())
        .any(|expected| answer_matches(expected, given, answer_type, case_sensitive))
}

/// Compare one expected answer with one given answer.
pub fn answer_matches(
    expected: &str,
    given: &str,
    answer_type: GapAnswerType,
    case_sensitive: bool,
) -> bool {
    match answer_type {
        GapAnswerType::Exact => text_eq(expected.trim(), given.trim(), case_sensitive),
        GapAnswerType::IgnoreWhitespace => text_eq(
            &strip_whitespace(expected),
            &strip_whitespace(given),
            case_sensitive,
        ),
        GapAnswerType::Numeric => match (parse_number(expected), parse_number(given)) {
            (Some(a), Some(b)) => (a - b).abs() < NUMERIC_TOLERANCE,
            _ => text_eq(expected.trim(), given.trim(), case_sensitive),
        },
    }
}

fn text_eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Decimal number with `.` or `,` as separator.
fn parse_number(s: &str) -> Option<f64> {
    let normalized = s.trim().replace(',', ".");
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekit_core::model::{Block, BlockKind, ContentDocument, QuestionMeta, QuestionSettings};
    use coursekit_core::parser::serialize;
    use serde_json::json;

    use crate::memory::InMemoryContentStore;

    fn gap(index: u32, answer: &str, alternatives: &[&str]) -> Gap {
        Gap {
            index,
            correct_answer: answer.into(),
            alternative_answers: alternatives.iter().map(|a| a.to_string()).collect(),
            hint: String::new(),
        }
    }

    fn payload() -> GapFillPayload {
        GapFillPayload {
            content: "The sky is [[blank1]], grass is [[blank2]], snow is [[blank3]].".into(),
            gaps: vec![
                gap(1, "blue", &["azure"]),
                gap(2, "green", &[]),
                gap(3, "white", &[]),
            ],
            answer_type: GapAnswerType::Exact,
            case_sensitive: false,
            meta: QuestionMeta {
                settings: Some(QuestionSettings {
                    points: 10,
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn store_with(payload: GapFillPayload, show_solutions: bool) -> Arc<InMemoryContentStore> {
        let doc = ContentDocument {
            item_type: ItemType::GapFill,
            blocks: vec![Block {
                id: "block-1".into(),
                kind: BlockKind::QuestionText,
                order: 0,
                data: BlockData::GapFill(payload),
            }],
        };
        let store = InMemoryContentStore::new();
        store.insert(coursekit_core::model::ScheduleItem {
            id: 5,
            item_type: ItemType::GapFill,
            show_solutions,
            content: serialize(&doc),
        });
        Arc::new(store)
    }

    #[test]
    fn all_gaps_correct() {
        let g = grade(&payload(), &json!({"answers": ["Blue", " green ", "WHITE"]})).unwrap();
        assert!(g.is_correct());
        assert_eq!(g.parts_correct, 3);
    }

    #[test]
    fn alternatives_are_accepted() {
        let g = grade(&payload(), &json!({"answers": {"1": "azure", "2": "green", "3": "white"}})).unwrap();
        assert!(g.is_correct());
    }

    #[test]
    fn partial_answers_by_index() {
        let g = grade(&payload(), &json!({"answers": {"1": "blue", "3": null}})).unwrap();
        assert_eq!(g.parts_correct, 1);
        assert_eq!(g.parts_total, 3);
        assert!(!g.is_correct());
    }

    #[test]
    fn padded_and_signed_keys_name_the_same_gap() {
        for key in ["01", "+1"] {
            let g = grade(&payload(), &json!({"answers": {key: "blue"}})).unwrap();
            assert_eq!(g.parts_correct, 1, "key {key:?}");
        }
    }

    #[test]
    fn case_sensitive_blocks_respect_case() {
        let mut p = payload();
        p.case_sensitive = true;
        let g = grade(&p, &json!({"answers": ["Blue", "green", "white"]})).unwrap();
        assert_eq!(g.parts_correct, 2);
    }

    #[test]
    fn answer_types() {
        assert!(answer_matches("New York", "newyork", GapAnswerType::IgnoreWhitespace, false));
        assert!(!answer_matches("New York", "newyork", GapAnswerType::Exact, false));
        assert!(answer_matches("3.50", "3,5", GapAnswerType::Numeric, false));
        assert!(answer_matches("100", 100.to_string().as_str(), GapAnswerType::Numeric, true));
        assert!(!answer_matches("3.5", "3.51", GapAnswerType::Numeric, false));
        assert!(answer_matches("pi", "PI", GapAnswerType::Numeric, false));
    }

    #[test]
    fn empty_answers_never_match() {
        assert!(!gap_matches(&gap(1, "", &[]), "", GapAnswerType::Exact, false));
        assert!(!gap_matches(&gap(1, "x", &[""]), "  ", GapAnswerType::Exact, false));
    }

    #[test]
    fn malformed_submissions() {
        let p = payload();
        for bad in [
            json!("blue"),
            json!({"answer": ["blue"]}),
            json!({"answers": ["blue", "green"]}),
            json!({"answers": {"7": "blue"}}),
            json!({"answers": {"one": "blue"}}),
            json!({"answers": {"1": "blue", "01": "azure"}}),
            json!({"answers": [true, "green", "white"]}),
            json!({"answers": 3}),
        ] {
            let err = grade(&p, &bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidAnswerFormat(_)),
                "{bad} should be malformed, got {err}"
            );
        }
    }

    #[test]
    fn numeric_answers_in_submission() {
        let mut p = payload();
        p.gaps[0] = gap(1, "100", &[]);
        p.answer_type = GapAnswerType::Numeric;
        let g = grade(&p, &json!({"answers": {"1": 100}})).unwrap();
        assert_eq!(g.parts_correct, 1);
    }

    #[test]
    fn correct_answer_shape() {
        let answer = correct_answer(&payload());
        assert_eq!(answer["answers"]["1"], json!(["blue", "azure"]));
        assert_eq!(answer["answers"]["3"], json!(["white"]));
    }

    #[tokio::test]
    async fn validate_partial_credit() {
        let validator = GapFillValidator::new(store_with(payload(), false));
        let result = validator
            .validate(5, "block-1", &json!({"answers": ["blue", "green", "black"]}))
            .await
            .unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.max_points, 10);
        assert_eq!(result.points_earned, 6);
        assert!(result.correct_answer.is_none());
    }

    #[tokio::test]
    async fn validate_all_or_nothing_with_solutions() {
        let validator = GapFillValidator::new(store_with(payload(), true))
            .with_scoring(ScoringMode::AllOrNothing);
        let result = validator
            .validate(5, "block-1", &json!({"answers": ["blue", "green", "black"]}))
            .await
            .unwrap();
        assert_eq!(result.points_earned, 0);
        assert!(result.correct_answer.is_some());
    }

    #[tokio::test]
    async fn validate_unknown_block_is_not_found() {
        let validator = GapFillValidator::new(store_with(payload(), false));
        let err = validator
            .validate(5, "block-404", &json!({"answers": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::BlockNotFound { .. }));

        let err = validator
            .validate(6, "block-1", &json!({"answers": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::ItemNotFound(6)));
    }

    #[tokio::test]
    async fn block_without_gaps_scores_zero() {
        let mut p = payload();
        p.content = "No blanks".into();
        p.gaps.clear();
        let validator = GapFillValidator::new(store_with(p, false));
        let result = validator
            .validate(5, "block-1", &json!({"answers": []}))
            .await
            .unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.points_earned, 0);
    }
}
