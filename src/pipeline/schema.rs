//! Feature schema: declared semantic types for known input features

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Semantic type a feature is coerced to by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// Parsed to 64-bit floating point
    Numeric,
    /// Parsed to a nanosecond datetime
    Timestamp,
    /// Stored as a polars categorical
    Category,
    /// Kept in its original representation
    Opaque,
}

impl FeatureType {
    pub fn label(&self) -> &'static str {
        match self {
            FeatureType::Numeric => "numeric",
            FeatureType::Timestamp => "timestamp",
            FeatureType::Category => "category",
            FeatureType::Opaque => "opaque",
        }
    }
}

/// Mapping from feature name to its declared [`FeatureType`].
///
/// Immutable once built. Names without an entry resolve to
/// [`FeatureType::Opaque`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    types: BTreeMap<String, FeatureType>,
}

impl FeatureSchema {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, FeatureType)>,
        S: Into<String>,
    {
        Self {
            types: entries
                .into_iter()
                .map(|(name, kind)| (name.into(), kind))
                .collect(),
        }
    }

    /// The curated dictionary for parking citation records
    pub fn parking_citations() -> Self {
        Self::new([
            ("IssueDate", FeatureType::Timestamp),
            ("IssueTime", FeatureType::Numeric),
            ("MarkedTime", FeatureType::Numeric),
            ("PlateExpiration", FeatureType::Numeric),
            ("Agency", FeatureType::Numeric),
            ("Fine", FeatureType::Numeric),
            ("Latitude", FeatureType::Numeric),
            ("Longitude", FeatureType::Numeric),
            ("StatePlate", FeatureType::Category),
            ("BodyStyle", FeatureType::Category),
            ("Color", FeatureType::Category),
            ("ViolationDesc", FeatureType::Category),
            ("ViolationCode", FeatureType::Category),
            ("Route", FeatureType::Category),
        ])
    }

    /// Load a schema from a JSON object of `name: type` pairs
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Declared type, or `None` when the feature is not in the dictionary
    pub fn declared(&self, feature: &str) -> Option<FeatureType> {
        self.types.get(feature).copied()
    }

    pub fn resolve(&self, feature: &str) -> FeatureType {
        self.declared(feature).unwrap_or(FeatureType::Opaque)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::parking_citations()
    }
}
