//! Gap-token reconciliation.
//!
//! Gap-fill content marks each blank with an inline `[[blankN]]` token. The
//! gap metadata list is derived from those tokens: one entry per distinct
//! index, ascending, keeping whatever the author already entered for indices
//! that survive an edit.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::Gap;

static GAP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[blank([1-9][0-9]*)\]\]").expect("gap token pattern is valid"));

/// Distinct gap indices referenced by `content`, ascending.
///
/// Indices that overflow `u32` are ignored.
pub fn gap_indices(content: &str) -> BTreeSet<u32> {
    GAP_TOKEN
        .captures_iter(content)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .collect()
}

/// Derive the canonical gap list for `content`.
///
/// Entries in `existing` whose index still appears are returned unchanged
/// (first one wins on duplicates); new indices get an empty entry; indices no
/// longer present are dropped.
pub fn reconcile(content: &str, existing: &[Gap]) -> Vec<Gap> {
    gap_indices(content)
        .into_iter()
        .map(|index| {
            existing
                .iter()
                .find(|g| g.index == index)
                .cloned()
                .unwrap_or_else(|| Gap::empty(index))
        })
        .collect()
}

/// Returns `true` if `gaps` is exactly what [`reconcile`] would produce.
pub fn is_reconciled(content: &str, gaps: &[Gap]) -> bool {
    reconcile(content, gaps) == gaps
}

/// Index for a newly inserted blank: one past the largest in use, or `None`
/// once `u32::MAX` is taken.
pub fn next_blank_index(content: &str) -> Option<u32> {
    match gap_indices(content).last() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

/// The token text for gap `index`.
pub fn blank_token(index: u32) -> String {
    format!("[[blank{index}]]")
}
