//! Payloads for newly created blocks.

use coursekit_core::model::{
    BlockData, BlockKind, ChoiceMode, ChoiceOption, ChoiceQuestion, GapFillPayload, ItemType, MediaPayload,
    MultipleChoicePayload, OpenQuestionPayload, PayloadShape,
};

/// The payload a fresh `kind` block starts with in a document of `item_type`.
pub fn default_payload(item_type: ItemType, kind: BlockKind) -> BlockData {
    match item_type.payload_shape(kind) {
        PayloadShape::Media => BlockData::Media(MediaPayload::default()),
        PayloadShape::GapFill => BlockData::GapFill(GapFillPayload::default()),
        PayloadShape::MultipleChoice => BlockData::MultipleChoice(MultipleChoicePayload {
            questions: vec![default_question("q1".into())],
            meta: Default::default(),
        }),
        PayloadShape::OpenQuestion => BlockData::OpenQuestion(OpenQuestionPayload::default()),
    }
}

/// A single-answer question with two blank options.
pub fn default_question(id: String) -> ChoiceQuestion {
    ChoiceQuestion {
        id,
        stem: String::new(),
        answer_type: ChoiceMode::Single,
        randomize: false,
        options: (0..2)
            .map(|index| ChoiceOption {
                index,
                text: String::new(),
                correct: false,
            })
            .collect(),
    }
}
