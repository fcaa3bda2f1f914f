//! Per-type cast functions used by the feature selector
//!
//! Each [`FeatureType`] variant has exactly one cast function. String inputs
//! are parsed cell by cell so a failure can name the offending row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};
use super::schema::FeatureType;

/// Datetime layouts tried, in order, after RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts; parsed values land at midnight
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// What to do with a numeric cell that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Fail the whole batch with `TypeCoercion`
    #[default]
    Strict,
    /// Replace the cell with null
    Nullify,
}

/// The polars dtype used for categorical features
pub fn categorical_dtype() -> DataType {
    DataType::Categorical(None, CategoricalOrdering::Physical)
}

/// Cast a column to the representation declared for `kind`
pub fn coerce_column(col: &Column, kind: FeatureType, policy: CoercionPolicy) -> Result<Column> {
    match kind {
        FeatureType::Numeric => to_numeric(col, policy),
        FeatureType::Timestamp => to_timestamp(col),
        FeatureType::Category => to_category(col),
        FeatureType::Opaque => Ok(col.clone()),
    }
}

fn to_numeric(col: &Column, policy: CoercionPolicy) -> Result<Column> {
    match col.dtype() {
        DataType::String => {
            let name = col.name().clone();
            let mut parsed: Vec<Option<f64>> = Vec::with_capacity(col.len());

            for (row, value) in col.str()?.into_iter().enumerate() {
                let cell = match value.map(str::trim) {
                    None | Some("") => None,
                    Some(text) => match text.parse::<f64>() {
                        Ok(v) => Some(v),
                        Err(_) if policy == CoercionPolicy::Nullify => None,
                        Err(_) => {
                            return Err(PipelineError::TypeCoercion {
                                column: name.to_string(),
                                row,
                                value: text.to_string(),
                                target: "Float64",
                            })
                        }
                    },
                };
                parsed.push(cell);
            }

            Ok(Column::new(name, parsed))
        }
        DataType::Categorical(_, _) | DataType::Enum(_, _) => {
            to_numeric(&col.cast(&DataType::String)?, policy)
        }
        dtype if dtype.is_primitive_numeric() || dtype.is_bool() => {
            Ok(col.cast(&DataType::Float64)?)
        }
        other => Err(PipelineError::TypeCoercion {
            column: col.name().to_string(),
            row: 0,
            value: format!("<{}>", other),
            target: "Float64",
        }),
    }
}

fn to_timestamp(col: &Column) -> Result<Column> {
    let target = DataType::Datetime(TimeUnit::Nanoseconds, None);

    match col.dtype() {
        DataType::String => {
            let name = col.name().clone();
            let mut nanos: Vec<Option<i64>> = Vec::with_capacity(col.len());

            for (row, value) in col.str()?.into_iter().enumerate() {
                let cell = match value.map(str::trim) {
                    None | Some("") => None,
                    Some(text) => {
                        let parsed = parse_timestamp(text)
                            .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
                            .ok_or_else(|| PipelineError::TypeCoercion {
                                column: name.to_string(),
                                row,
                                value: text.to_string(),
                                target: "Datetime",
                            })?;
                        Some(parsed)
                    }
                };
                nanos.push(cell);
            }

            Ok(Column::new(name, nanos).cast(&target)?)
        }
        DataType::Categorical(_, _) | DataType::Enum(_, _) => {
            to_timestamp(&col.cast(&DataType::String)?)
        }
        DataType::Date | DataType::Datetime(_, _) => Ok(col.cast(&target)?),
        dtype if dtype.is_integer() => Ok(col.cast(&DataType::Int64)?.cast(&target)?),
        other => Err(PipelineError::TypeCoercion {
            column: col.name().to_string(),
            row: 0,
            value: format!("<{}>", other),
            target: "Datetime",
        }),
    }
}

fn to_category(col: &Column) -> Result<Column> {
    match col.dtype() {
        DataType::Categorical(_, _) => Ok(col.clone()),
        DataType::String => Ok(col.cast(&categorical_dtype())?),
        _ => Ok(col.cast(&DataType::String)?.cast(&categorical_dtype())?),
    }
}

/// Parse a timestamp literal in any of the accepted layouts
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
