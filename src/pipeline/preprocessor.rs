//! The composed pipeline: feature selection followed by category aggregation
//!
//! A fitted [`Preprocessor`] is persisted as a single JSON document holding
//! the selector contract and every aggregated column's learned maps.

use std::path::Path;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use super::aggregator::{AggregatorConfig, CategoryAggregator};
use super::coerce::CoercionPolicy;
use super::diagnostics::Diagnostics;
use super::error::{PipelineError, Result};
use super::schema::FeatureSchema;
use super::selector::FeatureSelector;
use super::transformer::Transformer;

/// Version of the persisted pipeline layout
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to build an unfitted [`Preprocessor`]
#[derive(Debug, Clone)]
pub struct PreprocessorConfig {
    pub features: Vec<String>,
    pub schema: FeatureSchema,
    pub coercion: CoercionPolicy,
    /// Columns to aggregate. Empty means every configured feature declared
    /// as categorical.
    pub aggregation: AggregatorConfig,
}

impl PreprocessorConfig {
    pub fn new<S: Into<String>>(features: impl IntoIterator<Item = S>) -> Self {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            schema: FeatureSchema::default(),
            coercion: CoercionPolicy::default(),
            aggregation: AggregatorConfig::new(Vec::<String>::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    format_version: u32,
    selector: FeatureSelector,
    aggregator: CategoryAggregator,
    #[serde(skip)]
    diagnostics: Diagnostics,
}

impl Preprocessor {
    /// Compose two stages, connecting both to one diagnostics channel
    pub fn new(mut selector: FeatureSelector, mut aggregator: CategoryAggregator) -> Self {
        let diagnostics = aggregator.diagnostics().clone();
        selector.set_diagnostics(diagnostics.clone());
        aggregator.set_diagnostics(diagnostics.clone());
        Self {
            format_version: FORMAT_VERSION,
            selector,
            aggregator,
            diagnostics,
        }
    }

    /// Build from a config, publishing construction warnings on `diagnostics`
    pub fn from_config(config: PreprocessorConfig, diagnostics: Diagnostics) -> Result<Self> {
        let selector =
            FeatureSelector::with_diagnostics(config.features, config.schema, diagnostics.clone())
                .with_policy(config.coercion);

        let mut aggregation = config.aggregation;
        if aggregation.columns.is_empty() {
            aggregation.columns = selector.categorical_features();
        }
        if let Some(column) = aggregation
            .columns
            .iter()
            .find(|c| !selector.features().contains(c))
        {
            return Err(PipelineError::UnselectedColumn {
                column: column.clone(),
            });
        }
        let aggregator = CategoryAggregator::new(aggregation)?.with_diagnostics(diagnostics);

        Ok(Self::new(selector, aggregator))
    }

    pub fn selector(&self) -> &FeatureSelector {
        &self.selector
    }

    pub fn aggregator(&self) -> &CategoryAggregator {
        &self.aggregator
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut loaded: Self = serde_json::from_str(json)?;
        if loaded.format_version != FORMAT_VERSION {
            return Err(PipelineError::Persistence(format!(
                "unsupported format version {} (expected {})",
                loaded.format_version, FORMAT_VERSION
            )));
        }

        let diagnostics = Diagnostics::new();
        loaded.selector.set_diagnostics(diagnostics.clone());
        loaded.aggregator.set_diagnostics(diagnostics.clone());
        loaded.diagnostics = diagnostics;
        Ok(loaded)
    }

    #[tracing::instrument(skip(self))]
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("pipeline saved");
        Ok(())
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let loaded = Self::from_json(&contents)?;
        tracing::info!(
            features = loaded.selector.features().len(),
            aggregated = loaded.aggregator.columns().len(),
            "pipeline loaded"
        );
        Ok(loaded)
    }
}

impl Transformer for Preprocessor {
    #[tracing::instrument(name = "Preprocessor::fit", skip_all, fields(rows = df.height()))]
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.selector.fit(df)?;
        let selected = self.selector.transform(df)?;
        self.aggregator.fit(&selected)
    }

    #[tracing::instrument(name = "Preprocessor::transform", skip_all, fields(rows = df.height()))]
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let selected = self.selector.transform(df)?;
        self.aggregator.transform(&selected)
    }

    fn is_fitted(&self) -> bool {
        self.selector.is_fitted() && self.aggregator.is_fitted()
    }
}
