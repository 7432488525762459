//! coursekit-core: Content document model, reconciliation and grading flow.
//!
//! This crate defines the block-based content document, its wire format and
//! legacy migration, gap-token reconciliation, attempt statistics, and the
//! submission engine that ties validators and stores together.

pub mod engine;
pub mod error;
pub mod migrate;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod report;
pub mod statistics;
pub mod traits;
