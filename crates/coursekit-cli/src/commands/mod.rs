pub mod grade;
pub mod init;
pub mod migrate;
pub mod reconcile;
pub mod stats;
pub mod validate;
