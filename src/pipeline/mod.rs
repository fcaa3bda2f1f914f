//! Pipeline module - feature selection and category aggregation

pub mod aggregator;
pub mod categories;
pub mod coerce;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod preprocessor;
pub mod schema;
pub mod selector;
pub mod transformer;

pub use aggregator::{
    AggregatorConfig, CategoryAggregator, ColumnAggregation, MissingFrequencyPolicy,
    DEFAULT_THRESHOLD,
};
pub use categories::{Category, OTHER};
pub use coerce::CoercionPolicy;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::PipelineError;
pub use loader::*;
pub use preprocessor::{Preprocessor, PreprocessorConfig, FORMAT_VERSION};
pub use schema::{FeatureSchema, FeatureType};
pub use selector::FeatureSelector;
pub use transformer::Transformer;
