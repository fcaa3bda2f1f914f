//! Category values and frequency counting

use std::collections::HashMap;
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::Result;

/// Label of the catch-all bucket
pub const OTHER: &str = "Other";

/// A single categorical cell: a label, or the missing bucket for nulls
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Missing,
    Value(String),
}

impl Category {
    pub fn other() -> Self {
        Category::Value(OTHER.to_string())
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Category::Missing => None,
            Category::Value(v) => Some(v),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Missing => write!(f, "<missing>"),
            Category::Value(v) => write!(f, "{}", v),
        }
    }
}

impl From<Option<&str>> for Category {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(v) => Category::Value(v.to_string()),
            None => Category::Missing,
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::Value(value.to_string())
    }
}

/// Read a column as categories. Non-string columns are compared by their
/// string rendering.
pub fn column_categories(col: &Column) -> Result<Vec<Category>> {
    let as_string = match col.dtype() {
        DataType::String => col.clone(),
        _ => col.cast(&DataType::String)?,
    };

    Ok(as_string.str()?.into_iter().map(Category::from).collect())
}

/// Count occurrences of each category, nulls included, sorted descending.
///
/// Equal counts keep the order in which the categories were first
/// encountered, so the result is deterministic for a given input order.
pub fn value_counts(values: &[Category]) -> Vec<(Category, usize)> {
    let mut index: HashMap<&Category, usize> = HashMap::new();
    let mut counts: Vec<(Category, usize)> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }

    // Stable sort: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
