//! Loading the block a submission targets.

use coursekit_core::error::ValidationError;
use coursekit_core::model::{Block, ScheduleItem};
use coursekit_core::parser;
use coursekit_core::traits::ContentStore;

/// Fetch the schedule item and the block `block_id` inside its content.
pub async fn load_block(
    store: &dyn ContentStore,
    schedule_item_id: u64,
    block_id: &str,
) -> Result<(ScheduleItem, Block), ValidationError> {
    let item = store
        .schedule_item(schedule_item_id)
        .await?
        .ok_or(ValidationError::ItemNotFound(schedule_item_id))?;

    let doc = parser::load(&item.content, Some(item.item_type))?;
    let block = doc
        .blocks
        .into_iter()
        .find(|b| b.id == block_id)
        .ok_or_else(|| ValidationError::BlockNotFound {
            schedule_item_id,
            block_id: block_id.to_string(),
        })?;

    Ok((item, block))
}

/// The error for a block whose payload this validator cannot grade.
pub fn not_gradable(block: &Block, reason: impl Into<String>) -> ValidationError {
    ValidationError::NotGradable {
        block_id: block.id.clone(),
        reason: reason.into(),
    }
}
