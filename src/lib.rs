//! featagg: Feature Preprocessing Library
//!
//! Selects a fixed set of input features, coerces them to declared types and
//! collapses sparsely populated categorical values into a bounded vocabulary,
//! optionally encoding categories by their fitted frequency.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
