//! The fit/transform contract shared by pipeline stages

use polars::prelude::DataFrame;

use super::error::Result;

/// A stage that learns state from a batch and then rewrites batches with it.
///
/// `transform` takes `&self`: stages that keep growing state during
/// transform guard it internally.
pub trait Transformer {
    /// Learn state from `df`, replacing anything learned before
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    /// Produce a new batch. Fails with `NotFitted` before `fit`.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    fn is_fitted(&self) -> bool;

    fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}
