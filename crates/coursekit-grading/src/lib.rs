//! coursekit-grading: answer validators for gradable item types.
//!
//! Implements the `BlockValidator` trait for gap-fill and multiple-choice
//! items, plus configuration loading and in-memory stores.

pub mod config;
pub mod gap_fill;
pub mod lookup;
pub mod memory;
pub mod multiple_choice;
pub mod scoring;

pub use config::{build_registry, load_config_from, CoursekitConfig};
pub use gap_fill::GapFillValidator;
pub use memory::{InMemoryContentStore, InMemoryStatisticsStore};
pub use multiple_choice::MultipleChoiceValidator;
pub use scoring::{Grade, ScoringMode};
