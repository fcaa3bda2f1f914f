//! Feature selection and type coercion
//!
//! Projects a batch onto the configured features and casts each one to the
//! type declared in the [`FeatureSchema`].

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::coerce::{coerce_column, CoercionPolicy};
use super::diagnostics::{Diagnostic, Diagnostics};
use super::error::{PipelineError, Result};
use super::schema::{FeatureSchema, FeatureType};
use super::transformer::Transformer;

/// Selects the configured features and coerces them to their declared types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    features: Vec<String>,
    schema: FeatureSchema,
    #[serde(default)]
    policy: CoercionPolicy,
    /// Fitted contract, set by `fit`
    feature_names_in: Option<Vec<String>>,
    #[serde(skip)]
    diagnostics: Diagnostics,
}

impl FeatureSelector {
    /// Selector over the default parking-citation schema
    pub fn new<S: Into<String>>(features: impl IntoIterator<Item = S>) -> Self {
        Self::with_schema(features, FeatureSchema::default())
    }

    pub fn with_schema<S: Into<String>>(
        features: impl IntoIterator<Item = S>,
        schema: FeatureSchema,
    ) -> Self {
        Self::build(
            features.into_iter().map(Into::into).collect(),
            schema,
            Diagnostics::new(),
        )
    }

    /// Like [`FeatureSelector::with_schema`], publishing construction warnings
    /// on an existing channel
    pub fn with_diagnostics(
        features: Vec<String>,
        schema: FeatureSchema,
        diagnostics: Diagnostics,
    ) -> Self {
        Self::build(features, schema, diagnostics)
    }

    fn build(features: Vec<String>, schema: FeatureSchema, diagnostics: Diagnostics) -> Self {
        for feature in &features {
            if schema.declared(feature).is_none() {
                diagnostics.publish(Diagnostic::UnknownFeature {
                    feature: feature.clone(),
                });
            }
        }

        Self {
            features,
            schema,
            policy: CoercionPolicy::default(),
            feature_names_in: None,
            diagnostics,
        }
    }

    pub fn with_policy(mut self, policy: CoercionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    pub fn feature_names_in(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    /// Declared type for a configured feature
    pub fn feature_type(&self, feature: &str) -> FeatureType {
        self.schema.resolve(feature)
    }

    /// Configured features declared as categorical, in configured order
    pub fn categorical_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| self.feature_type(f) == FeatureType::Category)
            .cloned()
            .collect()
    }

    pub(crate) fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }
}

impl Transformer for FeatureSelector {
    #[tracing::instrument(name = "FeatureSelector::fit", skip_all, fields(rows = df.height()))]
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.feature_names_in = Some(self.features.clone());
        tracing::debug!(features = self.features.len(), "recorded feature contract");
        Ok(())
    }

    #[tracing::instrument(name = "FeatureSelector::transform", skip_all, fields(rows = df.height()))]
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let features = self
            .feature_names_in
            .as_ref()
            .ok_or(PipelineError::NotFitted {
                component: "FeatureSelector",
            })?;

        // Check every column up front so the error names the first missing one
        if let Some(missing) = features
            .iter()
            .find(|f| df.get_column_index(f.as_str()).is_none())
        {
            return Err(PipelineError::MissingColumn {
                column: missing.clone(),
            });
        }

        let columns = features
            .iter()
            .map(|name| {
                let col = df.column(name)?;
                coerce_column(col, self.feature_type(name), self.policy)
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    fn is_fitted(&self) -> bool {
        self.feature_names_in.is_some()
    }
}
