//! coursekit-editor: block list authoring for content documents.
//!
//! [`BlockEditor`] holds one document while it is being authored: adding,
//! moving, inserting and deleting blocks, editing payloads, and keeping
//! gap metadata reconciled with the blanks in gap-fill content.

pub mod defaults;
pub mod display;
pub mod editor;
pub mod error;
pub mod event;
pub mod hooks;

pub use editor::{BlockEditor, EditorMode, LoadOutcome};
pub use error::EditorError;
pub use event::EditorEvent;
pub use hooks::{AllTemplates, AlwaysConfirm, Confirm, NeverConfirm, TemplateCatalog};
