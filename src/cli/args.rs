//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::pipeline::{MissingFrequencyPolicy, DEFAULT_THRESHOLD};

/// featagg - Select features, coerce types and aggregate sparse categories
#[derive(Parser, Debug)]
#[command(name = "featagg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// RUST_LOG overrides this flag when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit a pipeline on a dataset, save it, and write the transformed dataset
    Fit(FitArgs),

    /// Apply a previously fitted pipeline to a dataset
    Transform(TransformArgs),

    /// Show the learned maps of a fitted pipeline
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Features to select, in output order (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub features: Vec<String>,

    /// Columns to aggregate (comma-separated).
    /// Defaults to every selected feature declared as categorical.
    #[arg(long, value_delimiter = ',')]
    pub categorical: Vec<String>,

    /// Cumulative-frequency share kept as distinct categories, in (0, 1]
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = validate_threshold)]
    pub threshold: f64,

    /// Replace aggregated categories by their fitted frequency
    #[arg(long, default_value = "false")]
    pub convert_to_numeric: bool,

    /// Encoding for a category with no fitted frequency
    #[arg(long, value_enum, default_value = "zero")]
    pub missing_frequency: MissingFrequencyArg,

    /// Turn unparsable numeric cells into nulls instead of failing
    #[arg(long, default_value = "false")]
    pub nullify_invalid: bool,

    /// JSON file mapping feature names to types (numeric, timestamp, category, opaque).
    /// Defaults to the built-in parking citation schema.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Where to write the fitted pipeline.
    /// Defaults to input directory with '_pipeline.json' suffix.
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_prepared' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Fitted pipeline JSON
    #[arg(short, long)]
    pub pipeline: PathBuf,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_prepared' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not write newly absorbed categories back to the pipeline file
    #[arg(long, default_value = "false")]
    pub no_update: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Fitted pipeline JSON
    #[arg(short, long)]
    pub pipeline: PathBuf,

    /// Only show this aggregated column
    #[arg(short, long)]
    pub column: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFrequencyArg {
    /// Encode as 0.0 and warn
    Zero,
    /// Fail the batch
    Error,
}

impl From<MissingFrequencyArg> for MissingFrequencyPolicy {
    fn from(arg: MissingFrequencyArg) -> Self {
        match arg {
            MissingFrequencyArg::Zero => MissingFrequencyPolicy::Zero,
            MissingFrequencyArg::Error => MissingFrequencyPolicy::Error,
        }
    }
}

impl FitArgs {
    /// Pipeline path, derived from the input when not given
    pub fn pipeline_path(&self) -> PathBuf {
        self.pipeline
            .clone()
            .unwrap_or_else(|| sibling_path(&self.input, "_pipeline", Some("json")))
    }

    /// Output path, derived from the input when not given
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| sibling_path(&self.input, "_prepared", None))
    }
}

impl TransformArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| sibling_path(&self.input, "_prepared", None))
    }
}

/// Path next to `input` with `suffix` appended to the stem. Keeps the input's
/// extension unless `extension` is given.
fn sibling_path(input: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = extension.unwrap_or_else(|| {
        input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("parquet")
    });
    parent.join(format!("{}{}.{}", stem, suffix, extension))
}

/// Validator for the aggregation threshold
fn validate_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("threshold must be in (0, 1], got {}", value))
    }
}
