//! Core data model types for coursekit.
//!
//! A schedule item's content is a [`ContentDocument`]: an item-type tag plus an
//! ordered list of typed [`Block`]s. Which block kinds are legal, and which
//! payload a question block carries, both depend on the item type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The schedule-item category a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Reminder,
    Written,
    Audio,
    #[serde(alias = "gap_fill", alias = "gap-fill")]
    GapFill,
    #[serde(alias = "multiple_choice", alias = "multiple-choice", alias = "quiz")]
    MultipleChoice,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [
        ItemType::Reminder,
        ItemType::Written,
        ItemType::Audio,
        ItemType::GapFill,
        ItemType::MultipleChoice,
    ];

    /// Block kinds that may appear in a document of this item type.
    pub fn allowed_kinds(self) -> &'static [BlockKind] {
        use BlockKind::*;
        match self {
            ItemType::Reminder => &[Text, Image, Video, Audio, Code],
            ItemType::Written => &[Text, Image, Video, Audio, Code, QuestionText, QuestionImage],
            ItemType::Audio => &[Text, Image, Video, Audio, Code, QuestionText, QuestionAudio],
            ItemType::GapFill => &[Text, Image, Video, Audio, Code, QuestionText, QuestionImage],
            ItemType::MultipleChoice => &[
                Text,
                Image,
                Video,
                Audio,
                Code,
                QuestionText,
                QuestionImage,
                QuestionVideo,
            ],
        }
    }

    pub fn allows(self, kind: BlockKind) -> bool {
        self.allowed_kinds().contains(&kind)
    }

    /// Payload carried by a block of `kind` in a document of this item type.
    pub fn payload_shape(self, kind: BlockKind) -> PayloadShape {
        if !kind.is_question() {
            return PayloadShape::Media;
        }
        match self {
            ItemType::GapFill => PayloadShape::GapFill,
            ItemType::MultipleChoice => PayloadShape::MultipleChoice,
            ItemType::Written | ItemType::Audio | ItemType::Reminder => PayloadShape::OpenQuestion,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Reminder => write!(f, "reminder"),
            ItemType::Written => write!(f, "written"),
            ItemType::Audio => write!(f, "audio"),
            ItemType::GapFill => write!(f, "gapfill"),
            ItemType::MultipleChoice => write!(f, "multiplechoice"),
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reminder" => Ok(ItemType::Reminder),
            "written" => Ok(ItemType::Written),
            "audio" => Ok(ItemType::Audio),
            "gapfill" | "gap_fill" | "gap-fill" => Ok(ItemType::GapFill),
            "multiplechoice" | "multiple_choice" | "multiple-choice" | "quiz" => {
                Ok(ItemType::MultipleChoice)
            }
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

/// The kind of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Text,
    Image,
    Video,
    Audio,
    Code,
    QuestionText,
    QuestionImage,
    QuestionVideo,
    QuestionAudio,
}

impl BlockKind {
    pub fn is_question(self) -> bool {
        matches!(
            self,
            BlockKind::QuestionText
                | BlockKind::QuestionImage
                | BlockKind::QuestionVideo
                | BlockKind::QuestionAudio
        )
    }

    /// Wire tag used in serialized documents.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Audio => "audio",
            BlockKind::Code => "code",
            BlockKind::QuestionText => "questionText",
            BlockKind::QuestionImage => "questionImage",
            BlockKind::QuestionVideo => "questionVideo",
            BlockKind::QuestionAudio => "questionAudio",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(BlockKind::Text),
            "image" => Ok(BlockKind::Image),
            "video" => Ok(BlockKind::Video),
            "audio" => Ok(BlockKind::Audio),
            "code" => Ok(BlockKind::Code),
            "questionText" | "question_text" => Ok(BlockKind::QuestionText),
            "questionImage" | "question_image" => Ok(BlockKind::QuestionImage),
            "questionVideo" | "question_video" => Ok(BlockKind::QuestionVideo),
            "questionAudio" | "question_audio" => Ok(BlockKind::QuestionAudio),
            other => Err(format!("unknown block type: {other}")),
        }
    }
}

/// Which payload struct a block's `data` decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Media,
    GapFill,
    MultipleChoice,
    OpenQuestion,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Horizontal placement of a media block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Layout hints for media blocks. Purely advisory for renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutHints {
    #[serde(default)]
    pub align: Alignment,
    #[serde(default)]
    pub width_percent: Option<u8>,
}

/// Payload of text, image, video, audio and code blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    /// Body text for text and code blocks.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub caption: String,
    /// Reference resolved by the file-storage collaborator.
    #[serde(default)]
    pub source: Option<String>,
    /// Highlighting language for code blocks.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub layout: LayoutHints,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Per-question grading settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSettings {
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_true")]
    pub is_required: bool,
}

impl Default for QuestionSettings {
    fn default() -> Self {
        Self {
            points: default_points(),
            difficulty: Difficulty::default(),
            is_required: true,
        }
    }
}

fn default_points() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Fields shared by every question payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMeta {
    #[serde(default)]
    pub settings: Option<QuestionSettings>,
    /// Block-level point value, used when `settings` is absent.
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub teacher_guidance: String,
}

impl QuestionMeta {
    pub fn max_points(&self) -> u32 {
        self.settings
            .as_ref()
            .map(|s| s.points)
            .unwrap_or(self.points)
    }
}

impl Default for QuestionMeta {
    fn default() -> Self {
        Self {
            settings: Some(QuestionSettings::default()),
            points: default_points(),
            teacher_guidance: String::new(),
        }
    }
}

/// How a gap answer is compared against the expected text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GapAnswerType {
    /// Surrounding whitespace is ignored, everything else must match.
    #[default]
    Exact,
    /// All whitespace is ignored.
    IgnoreWhitespace,
    /// Compared as decimal numbers when both sides parse.
    Numeric,
}

/// Answer metadata for one `[[blankN]]` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub index: u32,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub alternative_answers: Vec<String>,
    #[serde(default)]
    pub hint: String,
}

impl Gap {
    pub fn empty(index: u32) -> Self {
        Self {
            index,
            correct_answer: String::new(),
            alternative_answers: Vec::new(),
            hint: String::new(),
        }
    }

    /// The correct answer followed by all alternatives.
    pub fn accepted_answers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.correct_answer.as_str())
            .chain(self.alternative_answers.iter().map(String::as_str))
    }
}

/// Question payload of a gap-fill document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapFillPayload {
    /// Rich text containing `[[blankN]]` tokens.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub gaps: Vec<Gap>,
    #[serde(default)]
    pub answer_type: GapAnswerType,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(flatten)]
    pub meta: QuestionMeta,
}

impl GapFillPayload {
    pub fn gap(&self, index: u32) -> Option<&Gap> {
        self.gaps.iter().find(|g| g.index == index)
    }

    pub fn gap_mut(&mut self, index: u32) -> Option<&mut Gap> {
        self.gaps.iter_mut().find(|g| g.index == index)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceMode {
    #[default]
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// One question inside a multiple-choice block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    pub id: String,
    #[serde(default)]
    pub stem: String,
    #[serde(default)]
    pub answer_type: ChoiceMode,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
}

impl ChoiceQuestion {
    /// Indices of all options marked correct, in option order.
    pub fn correct_indices(&self) -> Vec<u32> {
        self.options
            .iter()
            .filter(|o| o.correct)
            .map(|o| o.index)
            .collect()
    }

    pub fn has_option(&self, index: u32) -> bool {
        self.options.iter().any(|o| o.index == index)
    }

    /// One past the largest option index, or the lowest free index once
    /// `u32::MAX` is in use.
    pub fn next_option_index(&self) -> u32 {
        match self.options.iter().map(|o| o.index).max() {
            None => 0,
            Some(max) => max
                .checked_add(1)
                .or_else(|| (0..=u32::MAX).find(|i| !self.has_option(*i)))
                .unwrap_or(0),
        }
    }
}

/// Question payload of a multiple-choice document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoicePayload {
    #[serde(default)]
    pub questions: Vec<ChoiceQuestion>,
    #[serde(flatten)]
    pub meta: QuestionMeta,
}

impl MultipleChoicePayload {
    pub fn question(&self, id: &str) -> Option<&ChoiceQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn question_mut(&mut self, id: &str) -> Option<&mut ChoiceQuestion> {
        self.questions.iter_mut().find(|q| q.id == id)
    }
}

/// Question payload of written and audio documents. Graded by a teacher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenQuestionPayload {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub sample_answer: String,
    #[serde(flatten)]
    pub meta: QuestionMeta,
}

/// A block's typed payload.
///
/// Serialized without a tag: the variant is implied by the block kind and the
/// document's item type (see [`ItemType::payload_shape`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BlockData {
    Media(MediaPayload),
    GapFill(GapFillPayload),
    MultipleChoice(MultipleChoicePayload),
    OpenQuestion(OpenQuestionPayload),
}

impl BlockData {
    /// Decode raw `data` JSON into the payload for `shape`. `null` is treated
    /// as an empty object.
    pub fn decode(shape: PayloadShape, value: serde_json::Value) -> serde_json::Result<Self> {
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };
        Ok(match shape {
            PayloadShape::Media => BlockData::Media(serde_json::from_value(value)?),
            PayloadShape::GapFill => BlockData::GapFill(serde_json::from_value(value)?),
            PayloadShape::MultipleChoice => {
                BlockData::MultipleChoice(serde_json::from_value(value)?)
            }
            PayloadShape::OpenQuestion => BlockData::OpenQuestion(serde_json::from_value(value)?),
        })
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            BlockData::Media(_) => PayloadShape::Media,
            BlockData::GapFill(_) => PayloadShape::GapFill,
            BlockData::MultipleChoice(_) => PayloadShape::MultipleChoice,
            BlockData::OpenQuestion(_) => PayloadShape::OpenQuestion,
        }
    }

    /// Question metadata, if this is a question payload.
    pub fn question_meta(&self) -> Option<&QuestionMeta> {
        match self {
            BlockData::Media(_) => None,
            BlockData::GapFill(p) => Some(&p.meta),
            BlockData::MultipleChoice(p) => Some(&p.meta),
            BlockData::OpenQuestion(p) => Some(&p.meta),
        }
    }

    pub fn question_meta_mut(&mut self) -> Option<&mut QuestionMeta> {
        match self {
            BlockData::Media(_) => None,
            BlockData::GapFill(p) => Some(&mut p.meta),
            BlockData::MultipleChoice(p) => Some(&mut p.meta),
            BlockData::OpenQuestion(p) => Some(&mut p.meta),
        }
    }
}

/// Prefix of minted block ids (`block-1`, `block-2`, ...).
pub const BLOCK_ID_PREFIX: &str = "block-";

/// Build the block id with numeric suffix `n`.
pub fn block_id(n: u64) -> String {
    format!("{BLOCK_ID_PREFIX}{n}")
}

/// Numeric suffix of a minted block id, or `None` for any other id.
pub fn block_id_suffix(id: &str) -> Option<u64> {
    id.strip_prefix(BLOCK_ID_PREFIX)?.parse().ok()
}

/// One typed unit of authored content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Stable identifier, never reused after deletion.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub order: usize,
    pub data: BlockData,
}

/// The content attached to a schedule item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub item_type: ItemType,
    pub blocks: Vec<Block>,
}

impl ContentDocument {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Sum of the point values of every question block.
    pub fn total_points(&self) -> u32 {
        self.blocks
            .iter()
            .filter_map(|b| b.data.question_meta())
            .map(QuestionMeta::max_points)
            .sum()
    }
}

/// A schedule item as seen by the validator: its type, its
/// "show solutions" flag and the raw persisted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: u64,
    pub item_type: ItemType,
    #[serde(default)]
    pub show_solutions: bool,
    /// Serialized content document, possibly in a legacy shape.
    pub content: String,
}
