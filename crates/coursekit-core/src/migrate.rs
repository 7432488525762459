//! Normalization of legacy content shapes into the current document shape.
//!
//! Recognized inputs:
//! - `{"itemType": .., "blocks": [..]}` (current, passed through untouched)
//! - `{"blocks": [..]}` without an item type
//! - `{"questionBlocks": [..]}` with or without an item type
//! - a bare array of blocks
//!
//! Legacy blocks get ids, types and contiguous orders filled in, and loose
//! payload fields are folded into `data`. Migration never inspects payload
//! semantics; that is left to the parser.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::model::{block_id, block_id_suffix, BlockKind, ItemType};

/// Keys that live on the block itself rather than inside `data`.
const BLOCK_KEYS: [&str; 4] = ["id", "type", "order", "data"];

/// Migrate a raw JSON value into the current `{itemType, blocks}` shape.
///
/// `fallback` supplies the item type for legacy shapes that do not carry one
/// (usually the owning schedule item's type).
pub fn migrate(raw: Value, fallback: Option<ItemType>) -> Result<Value, ParseError> {
    match raw {
        Value::Array(blocks) => {
            let item_type = resolve_item_type(None, fallback)?;
            Ok(current_shape(item_type, normalize_blocks(blocks)))
        }
        Value::Object(mut map) => {
            if let Some(legacy) = map.remove("questionBlocks") {
                let Value::Array(blocks) = legacy else {
                    return Err(ParseError::UnrecognizedShape(
                        "questionBlocks is not an array".into(),
                    ));
                };
                let item_type = resolve_item_type(take_item_type(&mut map), fallback)?;
                return Ok(current_shape(item_type, normalize_blocks(blocks)));
            }

            if map.contains_key("itemType") && map.contains_key("blocks") {
                return Ok(Value::Object(map));
            }

            match map.remove("blocks") {
                Some(Value::Array(blocks)) => {
                    let item_type = resolve_item_type(take_item_type(&mut map), fallback)?;
                    Ok(current_shape(item_type, normalize_blocks(blocks)))
                }
                Some(_) => Err(ParseError::UnrecognizedShape("blocks is not an array".into())),
                None => Err(ParseError::UnrecognizedShape(
                    "object has neither blocks nor questionBlocks".into(),
                )),
            }
        }
        other => Err(ParseError::UnrecognizedShape(format!(
            "expected an object or array, found {}",
            json_type_name(&other)
        ))),
    }
}

fn take_item_type(map: &mut Map<String, Value>) -> Option<Value> {
    map.remove("itemType").or_else(|| map.remove("type"))
}

fn resolve_item_type(found: Option<Value>, fallback: Option<ItemType>) -> Result<Value, ParseError> {
    match found {
        Some(Value::String(s)) => Ok(Value::String(s)),
        Some(other) => Err(ParseError::UnknownItemType(other.to_string())),
        None => fallback
            .map(|t| Value::String(t.to_string()))
            .ok_or(ParseError::MissingItemType),
    }
}

fn current_shape(item_type: Value, blocks: Vec<Value>) -> Value {
    let mut map = Map::new();
    map.insert("itemType".into(), item_type);
    map.insert("blocks".into(), Value::Array(blocks));
    Value::Object(map)
}

/// Fill in ids, types and orders, fold loose fields into `data`, and
/// renumber orders to `0..n` after a stable sort.
fn normalize_blocks(blocks: Vec<Value>) -> Vec<Value> {
    let mut normalized: Vec<(i64, Map<String, Value>)> = blocks
        .into_iter()
        .enumerate()
        .map(|(position, value)| normalize_block(position, value))
        .collect();

    normalized.sort_by_key(|(order, _)| *order);

    let mut taken: HashSet<String> = normalized
        .iter()
        .filter_map(|(_, b)| b.get("id").and_then(Value::as_str).map(str::to_string))
        .collect();
    let mut next_suffix = taken
        .iter()
        .filter_map(|id| block_id_suffix(id))
        .max()
        .map_or(Some(1), |max| max.checked_add(1));

    normalized
        .into_iter()
        .enumerate()
        .map(|(position, (_, mut block))| {
            if !block.contains_key("id") {
                let id = mint_block_id(&mut taken, &mut next_suffix);
                block.insert("id".into(), Value::String(id));
            }
            block.insert("order".into(), Value::from(position));
            Value::Object(block)
        })
        .collect()
}

/// Next unused `block-N` id. Once the counter has passed `u64::MAX` the
/// lowest free suffix is used instead.
fn mint_block_id(taken: &mut HashSet<String>, next_suffix: &mut Option<u64>) -> String {
    let suffix = next_suffix
        .filter(|n| !taken.contains(&block_id(*n)))
        .or_else(|| (1..=u64::MAX).find(|n| !taken.contains(&block_id(*n))))
        .unwrap_or(0);
    *next_suffix = suffix.checked_add(1);
    let id = block_id(suffix);
    taken.insert(id.clone());
    id
}

fn normalize_block(position: usize, value: Value) -> (i64, Map<String, Value>) {
    let mut source = match value {
        Value::Object(map) => map,
        Value::String(text) => {
            let mut data = Map::new();
            data.insert("content".into(), Value::String(text));
            let mut map = Map::new();
            map.insert("type".into(), Value::String(BlockKind::Text.to_string()));
            map.insert("data".into(), Value::Object(data));
            map
        }
        other => {
            let mut map = Map::new();
            map.insert("data".into(), other);
            map
        }
    };

    let order = source
        .get("order")
        .and_then(Value::as_i64)
        .unwrap_or(position as i64);

    let mut block = Map::new();
    match source.remove("id") {
        Some(Value::String(id)) => {
            block.insert("id".into(), Value::String(id));
        }
        Some(Value::Number(n)) => {
            block.insert("id".into(), Value::String(n.to_string()));
        }
        _ => {}
    }
    let kind = source
        .remove("type")
        .filter(Value::is_string)
        .unwrap_or_else(|| Value::String(BlockKind::QuestionText.to_string()));
    block.insert("type".into(), kind);

    let mut data = match source.remove("data") {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            // Non-object data is kept as-is for the parser to reject.
            block.insert("data".into(), other);
            return (order, block);
        }
    };
    for (key, value) in source {
        if !BLOCK_KEYS.contains(&key.as_str()) {
            data.entry(key).or_insert(value);
        }
    }
    normalize_gap_fields(&mut data);
    block.insert("data".into(), Value::Object(data));

    (order, block)
}

/// Older gap entries used `answer` and `alternatives`.
fn normalize_gap_fields(data: &mut Map<String, Value>) {
    let Some(Value::Array(gaps)) = data.get_mut("gaps") else {
        return;
    };
    for gap in gaps.iter_mut().filter_map(Value::as_object_mut) {
        rename_key(gap, "answer", "correctAnswer");
        rename_key(gap, "alternatives", "alternativeAnswers");
    }
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if map.contains_key(to) {
        return;
    }
    if let Some(value) = map.remove(from) {
        map.insert(to.to_string(), value);
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
