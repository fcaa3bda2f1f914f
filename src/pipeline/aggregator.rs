//! Frequency-based category aggregation
//!
//! For each configured column the aggregator learns which categories are
//! frequent enough to keep and collapses the rest into
//! [`OTHER`](super::categories::OTHER). It also
//! records how many fitted rows ended up in each aggregated category so the
//! column can optionally be encoded as those frequencies.
//!
//! # Threshold rule
//!
//! With `threshold_value = floor(threshold * rows)`, categories are walked in
//! descending count order. A category keeps its own label while the running
//! total of the categories before it is still below `threshold_value`; the
//! category that carries the total past the budget is therefore kept, and
//! everything after the budget is reached becomes `Other`.
//!
//! # Learned state during transform
//!
//! Values never seen at fit time are absorbed into the aggregation map as
//! `Other` the first time a transform meets them, and stay there until the
//! next `fit`. The map is a write-on-miss cache guarded by an `RwLock`, so a
//! fitted aggregator can be shared between threads; absorption only happens
//! after the whole batch has been encoded successfully.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::categories::{column_categories, value_counts, Category};
use super::coerce::categorical_dtype;
use super::diagnostics::{Diagnostic, Diagnostics};
use super::error::{PipelineError, Result};
use super::transformer::Transformer;

/// Default cumulative-frequency budget kept as distinct categories
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Encoding used for an aggregated category with no recorded frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFrequencyPolicy {
    /// Encode as 0.0 and publish a diagnostic
    #[default]
    Zero,
    /// Fail the batch with `UnknownFrequency`
    Error,
}

/// Configuration for a [`CategoryAggregator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub columns: Vec<String>,
    pub threshold: f64,
    #[serde(default)]
    pub convert_to_numeric: bool,
    #[serde(default)]
    pub missing_frequency: MissingFrequencyPolicy,
}

impl AggregatorConfig {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            threshold: DEFAULT_THRESHOLD,
            convert_to_numeric: false,
            missing_frequency: MissingFrequencyPolicy::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_convert_to_numeric(mut self, convert: bool) -> Self {
        self.convert_to_numeric = convert;
        self
    }

    pub fn with_missing_frequency(mut self, policy: MissingFrequencyPolicy) -> Self {
        self.missing_frequency = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(PipelineError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Insertion-ordered map keyed by category
#[derive(Debug, Clone)]
struct CategoryMap<V> {
    entries: Vec<(Category, V)>,
    index: HashMap<Category, usize>,
}

impl<V> Default for CategoryMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> CategoryMap<V> {
    fn get(&self, key: &Category) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Insert a new key. Existing keys are left untouched.
    fn insert(&mut self, key: Category, value: V) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<V> FromIterator<(Category, V)> for CategoryMap<V> {
    fn from_iter<I: IntoIterator<Item = (Category, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Raw category to target, plus a count of values absorbed after fitting
#[derive(Debug, Clone, Default)]
struct AggregationMap {
    targets: CategoryMap<Category>,
    absorbed: usize,
}

/// Learned state for a single column
#[derive(Debug)]
pub struct ColumnAggregation {
    column: String,
    row_count: usize,
    threshold_value: usize,
    mapping: RwLock<AggregationMap>,
    frequencies: CategoryMap<usize>,
}

impl ColumnAggregation {
    /// Learn the aggregation and frequency maps from one column's values
    pub fn fit(column: &str, values: &[Category], threshold: f64) -> Result<(Self, Option<Diagnostic>)> {
        let row_count = values.len();
        if row_count == 0 {
            return Err(PipelineError::EmptyColumn {
                column: column.to_string(),
            });
        }

        let counts = value_counts(values);
        let threshold_value = (threshold * row_count as f64).floor() as usize;

        let warning = counts
            .first()
            .filter(|(_, top_count)| *top_count > threshold_value)
            .map(|(top, top_count)| Diagnostic::DegenerateAggregation {
                column: column.to_string(),
                top_value: top.to_string(),
                top_count: *top_count,
                threshold_value,
            });

        let mut targets = CategoryMap::default();
        let mut running = 0usize;
        for (category, count) in &counts {
            let target = if running < threshold_value {
                category.clone()
            } else {
                Category::other()
            };
            running += count;
            targets.insert(category.clone(), target);
        }

        // Frequencies are counted on the collapsed values, not the raw ones
        let aggregated: Vec<Category> = values
            .iter()
            .map(|v| targets.get(v).cloned().unwrap_or_else(Category::other))
            .collect();
        let frequencies = value_counts(&aggregated).into_iter().collect();

        let fitted = Self {
            column: column.to_string(),
            row_count,
            threshold_value,
            mapping: RwLock::new(AggregationMap {
                targets,
                absorbed: 0,
            }),
            frequencies,
        };

        Ok((fitted, warning))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Rows in the batch this column was fitted on
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn threshold_value(&self) -> usize {
        self.threshold_value
    }

    /// Snapshot of the aggregation map in fit order, absorbed values last
    pub fn aggregation_map(&self) -> Vec<(Category, Category)> {
        self.read_mapping().targets.entries.clone()
    }

    /// Snapshot of the frequency map, most frequent first
    pub fn frequency_map(&self) -> Vec<(Category, usize)> {
        self.frequencies.entries.clone()
    }

    pub fn frequency(&self, category: &Category) -> Option<usize> {
        self.frequencies.get(category).copied()
    }

    pub fn target(&self, category: &Category) -> Option<Category> {
        self.read_mapping().targets.get(category).cloned()
    }

    /// Categories that keep their own label
    pub fn preserved_categories(&self) -> Vec<Category> {
        self.read_mapping()
            .targets
            .entries
            .iter()
            .filter(|(value, target)| value == target)
            .map(|(value, _)| value.clone())
            .collect()
    }

    /// Number of unseen values absorbed since fitting
    pub fn absorbed_count(&self) -> usize {
        self.read_mapping().absorbed
    }

    /// Distinct categories known to the aggregation map
    pub fn known_categories(&self) -> usize {
        self.read_mapping().targets.len()
    }

    /// Map values through the aggregation map without mutating it.
    /// Returns the aggregated values and the distinct unseen ones.
    fn aggregate(&self, values: &[Category]) -> (Vec<Category>, Vec<Category>) {
        let mapping = self.read_mapping();
        let mut unseen: Vec<Category> = Vec::new();
        let mut seen_unseen: HashSet<&Category> = HashSet::new();

        let aggregated = values
            .iter()
            .map(|value| match mapping.targets.get(value) {
                Some(target) => target.clone(),
                None => {
                    if seen_unseen.insert(value) {
                        unseen.push(value.clone());
                    }
                    Category::other()
                }
            })
            .collect();

        (aggregated, unseen)
    }

    /// Write-on-miss: record unseen values as `Other`. Returns those that
    /// were actually inserted by this call.
    fn absorb(&self, unseen: Vec<Category>) -> Vec<Category> {
        if unseen.is_empty() {
            return unseen;
        }
        let mut mapping = self
            .mapping
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut inserted = Vec::with_capacity(unseen.len());
        for value in unseen {
            if mapping.targets.insert(value.clone(), Category::other()) {
                mapping.absorbed += 1;
                inserted.push(value);
            }
        }
        inserted
    }

    /// Encode aggregated values as their fitted frequencies.
    /// Returns the encoded values and the distinct categories with no frequency.
    fn encode(
        &self,
        aggregated: &[Category],
        policy: MissingFrequencyPolicy,
    ) -> Result<(Vec<Option<f64>>, Vec<Category>)> {
        let mut unknown: Vec<Category> = Vec::new();
        let mut encoded = Vec::with_capacity(aggregated.len());

        for category in aggregated {
            match self.frequencies.get(category) {
                Some(&count) => encoded.push(Some(count as f64)),
                None => {
                    if policy == MissingFrequencyPolicy::Error {
                        return Err(PipelineError::UnknownFrequency {
                            column: self.column.clone(),
                            category: category.to_string(),
                        });
                    }
                    if !unknown.contains(category) {
                        unknown.push(category.clone());
                    }
                    encoded.push(Some(0.0));
                }
            }
        }

        Ok((encoded, unknown))
    }

    fn read_mapping(&self) -> std::sync::RwLockReadGuard<'_, AggregationMap> {
        self.mapping.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> ColumnSnapshot {
        let mapping = self.read_mapping();
        ColumnSnapshot {
            column: self.column.clone(),
            row_count: self.row_count,
            threshold_value: self.threshold_value,
            aggregation: mapping
                .targets
                .entries
                .iter()
                .map(|(value, target)| MapEntry {
                    value: value.clone(),
                    target: target.clone(),
                })
                .collect(),
            frequencies: self
                .frequencies
                .entries
                .iter()
                .map(|(category, count)| FrequencyEntry {
                    category: category.clone(),
                    count: *count,
                })
                .collect(),
            absorbed: mapping.absorbed,
        }
    }

    fn from_snapshot(snapshot: ColumnSnapshot) -> Self {
        Self {
            column: snapshot.column,
            row_count: snapshot.row_count,
            threshold_value: snapshot.threshold_value,
            mapping: RwLock::new(AggregationMap {
                targets: snapshot
                    .aggregation
                    .into_iter()
                    .map(|e| (e.value, e.target))
                    .collect(),
                absorbed: snapshot.absorbed,
            }),
            frequencies: snapshot
                .frequencies
                .into_iter()
                .map(|e| (e.category, e.count))
                .collect(),
        }
    }
}

impl Clone for ColumnAggregation {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            row_count: self.row_count,
            threshold_value: self.threshold_value,
            mapping: RwLock::new(self.read_mapping().clone()),
            frequencies: self.frequencies.clone(),
        }
    }
}

/// Collapses infrequent categories into "Other" and optionally encodes
/// categories by their fitted frequency
#[derive(Debug, Clone)]
pub struct CategoryAggregator {
    config: AggregatorConfig,
    fitted: Option<Vec<ColumnAggregation>>,
    diagnostics: Diagnostics,
}

impl CategoryAggregator {
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Fitted state for every configured column, in configured order
    pub fn columns(&self) -> &[ColumnAggregation] {
        self.fitted.as_deref().unwrap_or(&[])
    }

    pub fn column(&self, name: &str) -> Option<&ColumnAggregation> {
        self.columns().iter().find(|c| c.column == name)
    }

    pub fn aggregation_map(&self, column: &str) -> Option<Vec<(Category, Category)>> {
        self.column(column).map(ColumnAggregation::aggregation_map)
    }

    pub fn frequency_map(&self, column: &str) -> Option<Vec<(Category, usize)>> {
        self.column(column).map(ColumnAggregation::frequency_map)
    }

    pub fn threshold_value(&self, column: &str) -> Option<usize> {
        self.column(column).map(ColumnAggregation::threshold_value)
    }

    pub fn preserved_categories(&self, column: &str) -> Option<Vec<Category>> {
        self.column(column).map(ColumnAggregation::preserved_categories)
    }

    pub(crate) fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    fn require_columns(&self, df: &DataFrame) -> Result<()> {
        match self
            .config
            .columns
            .iter()
            .find(|c| df.get_column_index(c.as_str()).is_none())
        {
            Some(missing) => Err(PipelineError::MissingColumn {
                column: missing.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Transformer for CategoryAggregator {
    #[tracing::instrument(name = "CategoryAggregator::fit", skip_all, fields(rows = df.height()))]
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.require_columns(df)?;

        let values = self
            .config
            .columns
            .iter()
            .map(|name| -> Result<Vec<Category>> { column_categories(df.column(name)?) })
            .collect::<Result<Vec<_>>>()?;

        let threshold = self.config.threshold;
        let results = self
            .config
            .columns
            .par_iter()
            .zip(values.par_iter())
            .map(|(name, values)| ColumnAggregation::fit(name, values, threshold))
            .collect::<Result<Vec<_>>>()?;

        let mut fitted = Vec::with_capacity(results.len());
        for (column, warning) in results {
            if let Some(warning) = warning {
                self.diagnostics.publish(warning);
            }
            tracing::debug!(
                column = column.column.as_str(),
                threshold_value = column.threshold_value,
                preserved = column.preserved_categories().len(),
                categories = column.known_categories(),
                "fitted column"
            );
            fitted.push(column);
        }

        self.fitted = Some(fitted);
        Ok(())
    }

    #[tracing::instrument(name = "CategoryAggregator::transform", skip_all, fields(rows = df.height()))]
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::NotFitted {
            component: "CategoryAggregator",
        })?;
        self.require_columns(df)?;

        let mut out = df.clone();
        let mut pending: Vec<(&ColumnAggregation, Vec<Category>)> = Vec::new();
        let mut unknown_frequencies: Vec<Diagnostic> = Vec::new();

        for column in fitted {
            let source = df.column(&column.column)?;
            let values = column_categories(source)?;
            let (aggregated, unseen) = column.aggregate(&values);

            let replacement = if self.config.convert_to_numeric {
                let (encoded, unknown) = column.encode(&aggregated, self.config.missing_frequency)?;
                unknown_frequencies.extend(unknown.into_iter().map(|category| {
                    Diagnostic::UnknownFrequency {
                        column: column.column.clone(),
                        category: category.to_string(),
                    }
                }));
                Column::new(source.name().clone(), encoded)
            } else {
                let labels: Vec<Option<&str>> = aggregated.iter().map(Category::as_label).collect();
                Column::new(source.name().clone(), labels).cast(&categorical_dtype())?
            };

            out.with_column(replacement)?;
            pending.push((column, unseen));
        }

        // The batch succeeded; only now fold unseen values into learned state
        for (column, unseen) in pending {
            for value in column.absorb(unseen) {
                self.diagnostics.publish(Diagnostic::UnseenCategory {
                    column: column.column.clone(),
                    value: value.to_string(),
                });
            }
        }
        for diagnostic in unknown_frequencies {
            self.diagnostics.publish(diagnostic);
        }

        Ok(out)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

/// Persisted form of one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnSnapshot {
    column: String,
    row_count: usize,
    threshold_value: usize,
    aggregation: Vec<MapEntry>,
    frequencies: Vec<FrequencyEntry>,
    #[serde(default)]
    absorbed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MapEntry {
    value: Category,
    target: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrequencyEntry {
    category: Category,
    count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregatorState {
    config: AggregatorConfig,
    fitted: Option<Vec<ColumnSnapshot>>,
}

impl Serialize for CategoryAggregator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        AggregatorState {
            config: self.config.clone(),
            fitted: self
                .fitted
                .as_ref()
                .map(|cols| cols.iter().map(ColumnAggregation::snapshot).collect()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryAggregator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let state = AggregatorState::deserialize(deserializer)?;
        state.config.validate().map_err(serde::de::Error::custom)?;

        if let Some(snapshots) = &state.fitted {
            let names: Vec<&str> = snapshots.iter().map(|s| s.column.as_str()).collect();
            if names != state.config.columns.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(serde::de::Error::custom(format!(
                    "fitted columns {:?} do not match configured columns {:?}",
                    names, state.config.columns
                )));
            }
        }

        Ok(Self {
            config: state.config,
            fitted: state
                .fitted
                .map(|cols| cols.into_iter().map(ColumnAggregation::from_snapshot).collect()),
            diagnostics: Diagnostics::new(),
        })
    }
}
