//! Content document parser.
//!
//! Parses the JSON wire format into a [`ContentDocument`], serializes it back,
//! loads documents from disk, and lints them for authoring problems.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::migrate::migrate;
use crate::model::{Block, BlockData, BlockKind, ChoiceMode, ContentDocument, ItemType};
use crate::reconcile::{gap_indices, is_reconciled};

/// Parse a document in the current shape.
pub fn parse(raw: &str) -> Result<ContentDocument, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_value(value)
}

/// Parse an already-decoded JSON value in the current shape.
pub fn parse_value(value: Value) -> Result<ContentDocument, ParseError> {
    let Value::Object(mut map) = value else {
        return Err(ParseError::UnrecognizedShape("document is not an object".into()));
    };

    let item_type = match map.remove("itemType") {
        Some(Value::String(tag)) => tag
            .parse::<ItemType>()
            .map_err(|_| ParseError::UnknownItemType(tag))?,
        Some(other) => return Err(ParseError::UnknownItemType(other.to_string())),
        None => return Err(ParseError::MissingItemType),
    };

    let raw_blocks = match map.remove("blocks") {
        Some(Value::Array(blocks)) => blocks,
        Some(_) => return Err(ParseError::UnrecognizedShape("blocks is not an array".into())),
        None => return Err(ParseError::UnrecognizedShape("document has no blocks".into())),
    };

    let mut seen_ids = HashSet::new();
    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for (position, raw) in raw_blocks.into_iter().enumerate() {
        let block = parse_block(item_type, position, raw)?;
        if !seen_ids.insert(block.id.clone()) {
            return Err(ParseError::DuplicateBlockId(block.id));
        }
        blocks.push(block);
    }

    Ok(ContentDocument { item_type, blocks })
}

fn parse_block(item_type: ItemType, position: usize, raw: Value) -> Result<Block, ParseError> {
    let Value::Object(mut map) = raw else {
        return Err(ParseError::UnrecognizedShape(format!(
            "block at position {position} is not an object"
        )));
    };

    let id = match map.remove("id") {
        Some(Value::String(id)) => id,
        _ => {
            return Err(ParseError::MissingField {
                position,
                field: "id",
            })
        }
    };

    let kind = match map.remove("type") {
        Some(Value::String(tag)) => tag.parse::<BlockKind>().map_err(|_| {
            ParseError::UnknownBlockKind {
                block_id: id.clone(),
                kind: tag.clone(),
            }
        })?,
        _ => {
            return Err(ParseError::MissingField {
                position,
                field: "type",
            })
        }
    };

    if !item_type.allows(kind) {
        return Err(ParseError::IllegalBlockKind {
            block_id: id,
            kind,
            item_type,
        });
    }

    // A missing order means "in list position"; a present one must agree.
    if let Some(order) = map.get("order") {
        let found = order.as_i64().unwrap_or(-1);
        if found != position as i64 {
            return Err(ParseError::NonContiguousOrder {
                block_id: id,
                expected: position,
                found,
            });
        }
    }

    let data = map.remove("data").unwrap_or(Value::Object(Map::new()));
    let data = BlockData::decode(item_type.payload_shape(kind), data).map_err(|source| {
        ParseError::InvalidPayload {
            block_id: id.clone(),
            source,
        }
    })?;

    Ok(Block {
        id,
        kind,
        order: position,
        data,
    })
}

/// Serialize a document to its JSON wire format.
pub fn serialize(doc: &ContentDocument) -> String {
    // Every field is a string, number, bool, list or map with string keys.
    serde_json::to_string(doc).unwrap_or_else(|e| unreachable!("document serialization: {e}"))
}

/// Serialize a document as indented JSON for files meant to be read by people.
pub fn serialize_pretty(doc: &ContentDocument) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|e| unreachable!("document serialization: {e}"))
}

/// Migrate then parse. `fallback` is the item type to assume when a legacy
/// document does not name one.
pub fn load(raw: &str, fallback: Option<ItemType>) -> Result<ContentDocument, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_value(migrate(value, fallback)?)
}

/// Read and load a document file.
pub fn load_document_file(path: &Path, fallback: Option<ItemType>) -> Result<ContentDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content document: {}", path.display()))?;
    load(&raw, fallback)
        .with_context(|| format!("failed to parse content document: {}", path.display()))
}

/// Recursively load all `.json` documents from a directory.
///
/// Files that fail to load are skipped with a warning.
pub fn load_document_directory(dir: &Path) -> Result<Vec<(std::path::PathBuf, ContentDocument)>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut docs = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            docs.extend(load_document_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match load_document_file(&path, None) {
                Ok(doc) => docs.push((path, doc)),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }

    Ok(docs)
}

/// A problem found by [`lint`] that does not make the document illegal.
#[derive(Debug, Clone)]
pub struct DocumentWarning {
    /// The block the warning refers to.
    pub block_id: String,
    pub message: String,
}

/// Check a document for common authoring problems.
pub fn lint(doc: &ContentDocument) -> Vec<DocumentWarning> {
    let mut warnings = Vec::new();
    let mut warn = |block: &Block, message: String| {
        warnings.push(DocumentWarning {
            block_id: block.id.clone(),
            message,
        });
    };

    for block in &doc.blocks {
        match &block.data {
            BlockData::GapFill(payload) => {
                if !is_reconciled(&payload.content, &payload.gaps) {
                    let tokens: Vec<String> = gap_indices(&payload.content)
                        .iter()
                        .map(u32::to_string)
                        .collect();
                    warn(
                        block,
                        format!(
                            "gap metadata does not match blanks in content (tokens: [{}])",
                            tokens.join(", ")
                        ),
                    );
                }
                if payload.gaps.is_empty() {
                    warn(block, "gap-fill question has no blanks".into());
                }
                for gap in &payload.gaps {
                    if gap.correct_answer.trim().is_empty() {
                        warn(block, format!("gap {} has no correct answer", gap.index));
                    }
                }
            }
            BlockData::MultipleChoice(payload) => {
                if payload.questions.is_empty() {
                    warn(block, "multiple-choice block has no questions".into());
                }
                let mut question_ids = HashSet::new();
                for question in &payload.questions {
                    if !question_ids.insert(question.id.as_str()) {
                        warn(block, format!("duplicate question id: {}", question.id));
                    }
                    if question.stem.trim().is_empty() {
                        warn(block, format!("question {} has an empty stem", question.id));
                    }
                    let mut option_indices = HashSet::new();
                    for option in &question.options {
                        if !option_indices.insert(option.index) {
                            warn(
                                block,
                                format!(
                                    "question {} has duplicate option index {}",
                                    question.id, option.index
                                ),
                            );
                        }
                    }
                    let correct = question.correct_indices().len();
                    if correct == 0 {
                        warn(block, format!("question {} has no correct option", question.id));
                    } else if correct > 1 && question.answer_type == ChoiceMode::Single {
                        warn(
                            block,
                            format!(
                                "question {} is single-answer but has {correct} correct options",
                                question.id
                            ),
                        );
                    }
                }
            }
            BlockData::OpenQuestion(payload) => {
                if payload.prompt.trim().is_empty() {
                    warn(block, "open question has an empty prompt".into());
                }
            }
            BlockData::Media(payload) => {
                let needs_source = matches!(
                    block.kind,
                    BlockKind::Image | BlockKind::Video | BlockKind::Audio
                );
                if needs_source && payload.source.as_deref().unwrap_or("").is_empty() {
                    warn(block, format!("{} block has no source", block.kind));
                }
            }
        }
    }

    warnings
}
