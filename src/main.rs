//! featagg: Feature Preprocessing CLI Tool
//!
//! Fits, applies and inspects feature selection and category aggregation
//! pipelines on CSV and Parquet datasets.

use anyhow::Result;
use clap::Parser;

use featagg::cli::{run_fit, run_inspect, run_transform, Cli, Commands};
use featagg::utils::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Fit(args) => run_fit(args),
        Commands::Transform(args) => run_transform(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}
