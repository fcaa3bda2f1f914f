//! Report module - summarizing learned aggregation state

pub mod summary;

pub use summary::*;
