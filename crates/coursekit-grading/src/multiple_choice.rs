//! Multiple-choice validator.
//!
//! Accepted submissions:
//! - `{"selected": [0, 2]}` or `{"selected": 0}`: only for blocks with exactly
//!   one question
//! - `{"answers": [{"questionId": "q1", "selected": [0]}]}`: any block; a
//!   question left out counts as unanswered

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use coursekit_core::error::ValidationError;
use coursekit_core::model::{BlockData, ChoiceMode, ChoiceQuestion, ItemType, MultipleChoicePayload};
use coursekit_core::traits::{BlockValidationResult, BlockValidator, ContentStore};

use crate::lookup::{load_block, not_gradable};
use crate::scoring::{Grade, ScoringMode};

/// Grades multiple-choice blocks.
pub struct MultipleChoiceValidator {
    content: Arc<dyn ContentStore>,
    scoring: ScoringMode,
}

impl MultipleChoiceValidator {
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
impl BlockValidator for MultipleChoiceValidator {
    fn supported_type(&self) -> ItemType {
        ItemType::MultipleChoice
    }

    async fn validate(
        &self,
        schedule_item_id: u64,
        block_id: &str,
        submitted_answer: &Value,
    ) -> Result<BlockValidationResult, ValidationError> {
        let (item, block) = load_block(self.content.as_ref(), schedule_item_id, block_id).await?;
        let BlockData::MultipleChoice(payload) = &block.data else {
            return Err(not_gradable(&block, "not a multiple-choice question"));
        };

        let grade = grade(payload, submitted_answer)?;
        Ok(grade.into_result(&item, &payload.meta, self.scoring))
    }
}

/// Grade a submission against a multiple-choice payload.
pub fn grade(payload: &MultipleChoicePayload, submitted: &Value) -> Result<Grade, ValidationError> {
    let selections = selections(payload, submitted)?;

    let parts_correct = payload
        .questions
        .iter()
        .filter(|q| {
            selections
                .get(q.id.as_str())
                .is_some_and(|selected| question_correct(q, selected))
        })
        .count() as u32;

    Ok(Grade {
        parts_correct,
        parts_total: payload.questions.len() as u32,
        correct_answer: correct_answer(payload),
    })
}

/// Whether `selected` is exactly the right answer to `question`.
///
/// A `single` question is answered correctly by its one correct option; a
/// question with several options marked correct can never be.
pub fn question_correct(question: &ChoiceQuestion, selected: &BTreeSet<u32>) -> bool {
    let correct: BTreeSet<u32> = question.correct_indices().into_iter().collect();
    match question.answer_type {
        ChoiceMode::Single => correct.len() == 1 && *selected == correct,
        ChoiceMode::Multi => !correct.is_empty() && *selected == correct,
    }
}

/// `{"answers": [{"questionId": .., "correct": [..]}]}`
pub fn correct_answer(payload: &MultipleChoicePayload) -> Value {
    let answers: Vec<Value> = payload
        .questions
        .iter()
        .map(|q| json!({ "questionId": q.id, "correct": q.correct_indices() }))
        .collect();
    json!({ "answers": answers })
}

/// Selected option sets keyed by question id.
fn selections<'a>(
    payload: &'a MultipleChoicePayload,
    submitted: &Value,
) -> Result<HashMap<&'a str, BTreeSet<u32>>, ValidationError> {
    let mut out = HashMap::new();

    if let Some(selected) = submitted.get("selected") {
        let [question] = payload.questions.as_slice() else {
            return Err(malformed(format!(
                "`selected` needs a block with one question, this one has {}; use `answers`",
                payload.questions.len()
            )));
        };
        out.insert(question.id.as_str(), selected_indices(question, selected)?);
        return Ok(out);
    }

    let Some(answers) = submitted.get("answers") else {
        return Err(malformed("expected an object with `selected` or `answers`"));
    };
    let Value::Array(answers) = answers else {
        return Err(malformed("`answers` must be a list"));
    };

    for answer in answers {
        let id = answer
            .get("questionId")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("each answer needs a string `questionId`"))?;
        let question = payload
            .question(id)
            .ok_or_else(|| malformed(format!("unknown question `{id}`")))?;
        let selected = answer
            .get("selected")
            .ok_or_else(|| malformed(format!("answer for `{id}` has no `selected`")))?;
        let indices = selected_indices(question, selected)?;
        if out.insert(question.id.as_str(), indices).is_some() {
            return Err(malformed(format!("question `{id}` answered twice")));
        }
    }
    Ok(out)
}

fn selected_indices(question: &ChoiceQuestion, selected: &Value) -> Result<BTreeSet<u32>, ValidationError> {
    let values: Vec<&Value> = match selected {
        Value::Array(list) => list.iter().collect(),
        Value::Number(_) => vec![selected],
        Value::Null => Vec::new(),
        other => return Err(malformed(format!("`selected` must be an index or a list, got {other}"))),
    };

    values
        .into_iter()
        .map(|v| {
            let index = v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| malformed(format!("`{v}` is not an option index")))?;
            if !question.has_option(index) {
                return Err(malformed(format!(
                    "question `{}` has no option {index}",
                    question.id
                )));
            }
            Ok(index)
        })
        .collect()
}

fn malformed(message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidAnswerFormat(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekit_core::model::{
        Block, BlockKind, ChoiceOption, ContentDocument, QuestionMeta, QuestionSettings, ScheduleItem,
    };
    use coursekit_core::parser::serialize;

    use crate::memory::InMemoryContentStore;

    fn option(index: u32, text: &str, correct: bool) -> ChoiceOption {
        ChoiceOption {
            index,
            text: text.into(),
            correct,
        }
    }

    fn capital_question() -> ChoiceQuestion {
        ChoiceQuestion {
            id: "q1".into(),
            stem: "Capital of France?".into(),
            answer_type: ChoiceMode::Single,
            randomize: false,
            options: vec![option(0, "Paris", true), option(1, "Lyon", false)],
        }
    }

    fn primes_question() -> ChoiceQuestion {
        ChoiceQuestion {
            id: "q2".into(),
            stem: "Which are prime?".into(),
            answer_type: ChoiceMode::Multi,
            randomize: false,
            options: vec![
                option(0, "2", true),
                option(1, "4", false),
                option(2, "5", true),
            ],
        }
    }

    fn payload(questions: Vec<ChoiceQuestion>, points: u32) -> MultipleChoicePayload {
        MultipleChoicePayload {
            questions,
            meta: QuestionMeta {
                settings: Some(QuestionSettings {
                    points,
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn store_with(payload: MultipleChoicePayload) -> Arc<InMemoryContentStore> {
        let doc = ContentDocument {
            item_type: ItemType::MultipleChoice,
            blocks: vec![
                Block {
                    id: "block-1".into(),
                    kind: BlockKind::Text,
                    order: 0,
                    data: BlockData::Media(Default::default()),
                },
                Block {
                    id: "block-2".into(),
                    kind: BlockKind::QuestionText,
                    order: 1,
                    data: BlockData::MultipleChoice(payload),
                },
            ],
        };
        let store = InMemoryContentStore::new();
        store.insert(ScheduleItem {
            id: 9,
            item_type: ItemType::MultipleChoice,
            show_solutions: true,
            content: serialize(&doc),
        });
        Arc::new(store)
    }

    #[tokio::test]
    async fn single_choice_correct() {
        let validator = MultipleChoiceValidator::new(store_with(payload(vec![capital_question()], 4)));
        let result = validator
            .validate(9, "block-2", &json!({"selected": [0]}))
            .await
            .unwrap();
        assert!(result.is_correct);
        assert_eq!(result.points_earned, result.max_points);
        assert_eq!(result.max_points, 4);
        assert_eq!(
            result.correct_answer,
            Some(json!({"answers": [{"questionId": "q1", "correct": [0]}]}))
        );
    }

    #[tokio::test]
    async fn single_choice_with_two_selections_is_wrong() {
        let validator = MultipleChoiceValidator::new(store_with(payload(vec![capital_question()], 4)));
        let result = validator
            .validate(9, "block-2", &json!({"selected": [0, 1]}))
            .await
            .unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.points_earned, 0);
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let validator = MultipleChoiceValidator::new(store_with(payload(vec![capital_question()], 1)));
        let err = validator
            .validate(9, "block-77", &json!({"selected": 0}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn media_block_is_not_gradable() {
        let validator = MultipleChoiceValidator::new(store_with(payload(vec![capital_question()], 1)));
        let err = validator
            .validate(9, "block-1", &json!({"selected": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotGradable { .. }));
    }

    #[test]
    fn scalar_selection() {
        let g = grade(&payload(vec![capital_question()], 1), &json!({"selected": 0})).unwrap();
        assert!(g.is_correct());
    }

    #[test]
    fn multi_requires_exact_set() {
        let p = payload(vec![primes_question()], 1);
        assert!(grade(&p, &json!({"selected": [2, 0]})).unwrap().is_correct());
        assert!(grade(&p, &json!({"selected": [0, 0, 2]})).unwrap().is_correct());
        assert!(!grade(&p, &json!({"selected": [0]})).unwrap().is_correct());
        assert!(!grade(&p, &json!({"selected": [0, 1, 2]})).unwrap().is_correct());
        assert!(!grade(&p, &json!({"selected": []})).unwrap().is_correct());
    }

    #[test]
    fn several_questions_score_per_question() {
        let p = payload(vec![capital_question(), primes_question()], 10);
        let g = grade(
            &p,
            &json!({"answers": [
                {"questionId": "q1", "selected": [0]},
                {"questionId": "q2", "selected": [0]}
            ]}),
        )
        .unwrap();
        assert_eq!((g.parts_correct, g.parts_total), (1, 2));

        let unanswered = grade(&p, &json!({"answers": [{"questionId": "q2", "selected": [0, 2]}]})).unwrap();
        assert_eq!(unanswered.parts_correct, 1);
        assert!(!unanswered.is_correct());
    }

    #[test]
    fn malformed_submissions() {
        let single = payload(vec![capital_question()], 1);
        let double = payload(vec![capital_question(), primes_question()], 1);
        let cases = [
            (&single, json!({})),
            (&single, json!({"selected": "Paris"})),
            (&single, json!({"selected": [5]})),
            (&single, json!({"selected": [-1]})),
            (&double, json!({"selected": [0]})),
            (&double, json!({"answers": {"q1": [0]}})),
            (&double, json!({"answers": [{"questionId": "q9", "selected": [0]}]})),
            (&double, json!({"answers": [{"selected": [0]}]})),
            (
                &double,
                json!({"answers": [
                    {"questionId": "q1", "selected": [0]},
                    {"questionId": "q1", "selected": [1]}
                ]}),
            ),
        ];
        for (p, bad) in cases {
            let err = grade(p, &bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidAnswerFormat(_)),
                "{bad} should be malformed, got {err}"
            );
        }
    }

    #[test]
    fn question_without_correct_option_never_passes() {
        let mut q = capital_question();
        q.options[0].correct = false;
        assert!(!question_correct(&q, &BTreeSet::new()));
        assert!(!question_correct(&q, &BTreeSet::from([0])));
    }

    #[test]
    fn empty_block_scores_zero() {
        let g = grade(&payload(Vec::new(), 5), &json!({"answers": []})).unwrap();
        assert!(!g.is_correct());
        assert_eq!(g.parts_total, 0);
    }
}
