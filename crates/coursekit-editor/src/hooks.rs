//! Collaborators the editor consults before side-effecting actions.

use std::collections::HashSet;

use coursekit_core::model::BlockKind;

/// Asks the author to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirms everything. For scripted edits and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Reports which block templates the rendering host has available.
pub trait TemplateCatalog {
    fn has_template(&self, kind: BlockKind) -> bool;
}

/// Every template is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllTemplates;

impl TemplateCatalog for AllTemplates {
    fn has_template(&self, _kind: BlockKind) -> bool {
        true
    }
}

impl TemplateCatalog for HashSet<BlockKind> {
    fn has_template(&self, kind: BlockKind) -> bool {
        self.contains(&kind)
    }
}
