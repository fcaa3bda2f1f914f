//! Subcommand runners

use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Table};
use console::style;

use super::args::{FitArgs, InspectArgs, TransformArgs};
use crate::pipeline::{
    load_dataset_with_progress, save_dataset, AggregatorConfig, CoercionPolicy, Diagnostic,
    Diagnostics, FeatureSchema, Preprocessor, PreprocessorConfig, Transformer,
};
use crate::report::{display_column_maps, AggregationSummary};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_info, print_step_header, print_success, print_warning,
};

/// Fit a pipeline, persist it, and write the transformed dataset
pub fn run_fit(args: &FitArgs) -> Result<()> {
    let pipeline_path = args.pipeline_path();
    let output_path = args.output_path();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &args.input,
        &pipeline_path,
        &output_path,
        args.threshold,
        args.convert_to_numeric,
    );

    let schema = match &args.schema {
        Some(path) => FeatureSchema::from_json_file(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?,
        None => FeatureSchema::default(),
    };

    let config = PreprocessorConfig {
        features: args.features.clone(),
        schema,
        coercion: if args.nullify_invalid {
            CoercionPolicy::Nullify
        } else {
            CoercionPolicy::Strict
        },
        aggregation: AggregatorConfig::new(args.categorical.clone())
            .with_threshold(args.threshold)
            .with_convert_to_numeric(args.convert_to_numeric)
            .with_missing_frequency(args.missing_frequency.into()),
    };

    let diagnostics = Diagnostics::new();
    let warnings = diagnostics.subscribe();
    let mut preprocessor = Preprocessor::from_config(config, diagnostics)?;
    report_warnings(&warnings);

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let (df, _, _) = load_dataset_with_progress(&args.input, args.infer_schema_length)?;
    print_step_time(step_start);

    // Step 2: Fit and transform
    print_step_header(2, "Fit Pipeline");
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting feature selector and category aggregator...");
    preprocessor
        .fit(&df)
        .context("Failed to fit pipeline")?;
    let mut prepared = preprocessor
        .transform(&df)
        .context("Failed to transform dataset")?;
    finish_with_success(&spinner, "Pipeline fitted");
    report_warnings(&warnings);
    print_step_time(step_start);

    // Step 3: Save results
    print_step_header(3, "Save Results");
    let step_start = Instant::now();
    preprocessor
        .save(&pipeline_path)
        .with_context(|| format!("Failed to write pipeline: {}", pipeline_path.display()))?;
    print_success(&format!("Pipeline saved to {}", pipeline_path.display()));
    save_dataset(&mut prepared, &output_path)?;
    print_success(&format!("Dataset saved to {}", output_path.display()));
    print_step_time(step_start);

    AggregationSummary::from_aggregator(preprocessor.aggregator()).display();
    print_completion("Pipeline fitted!");

    Ok(())
}

/// Apply a fitted pipeline to a new dataset
pub fn run_transform(args: &TransformArgs) -> Result<()> {
    let output_path = args.output_path();

    let preprocessor = Preprocessor::load(&args.pipeline)
        .with_context(|| format!("Failed to load pipeline: {}", args.pipeline.display()))?;
    let warnings = preprocessor.diagnostics().subscribe();
    let absorbed_before = AggregationSummary::from_aggregator(preprocessor.aggregator()).total_absorbed();

    print_step_header(1, "Load Dataset");
    let (df, _, _) = load_dataset_with_progress(&args.input, args.infer_schema_length)?;

    print_step_header(2, "Transform");
    let spinner = create_spinner("Applying pipeline...");
    let mut prepared = preprocessor
        .transform(&df)
        .context("Failed to transform dataset")?;

    let summary = AggregationSummary::from_aggregator(preprocessor.aggregator());
    let newly_absorbed = summary.total_absorbed() - absorbed_before;
    if newly_absorbed == 0 {
        finish_with_success(&spinner, "Dataset transformed");
    } else {
        finish_with_warning(
            &spinner,
            &format!("Dataset transformed, {} unseen categories mapped to Other", newly_absorbed),
        );
    }
    report_warnings(&warnings);

    print_step_header(3, "Save Results");
    save_dataset(&mut prepared, &output_path)?;
    print_success(&format!("Dataset saved to {}", output_path.display()));

    if newly_absorbed > 0 && !args.no_update {
        preprocessor
            .save(&args.pipeline)
            .with_context(|| format!("Failed to update pipeline: {}", args.pipeline.display()))?;
        print_success("Pipeline updated with absorbed categories");
    }

    summary.display();
    print_completion("Transform complete!");

    Ok(())
}

/// Print the selector contract and learned maps of a fitted pipeline
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let preprocessor = Preprocessor::load(&args.pipeline)
        .with_context(|| format!("Failed to load pipeline: {}", args.pipeline.display()))?;

    if !preprocessor.is_fitted() {
        print_warning("Pipeline has not been fitted");
    }

    let selector = preprocessor.selector();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Feature").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
    ]);
    for feature in selector.features() {
        table.add_row(vec![
            Cell::new(feature),
            Cell::new(selector.feature_type(feature).label()),
        ]);
    }

    println!();
    println!("    {} {}", style("📋").cyan(), style("FEATURES").white().bold());
    for line in table.to_string().lines() {
        println!("    {}", line);
    }

    let aggregator = preprocessor.aggregator();
    match &args.column {
        Some(name) => {
            let column = aggregator
                .column(name)
                .ok_or_else(|| anyhow::anyhow!("Column '{}' is not aggregated by this pipeline", name))?;
            display_column_maps(column);
        }
        None => {
            if aggregator.columns().is_empty() {
                print_info("No aggregated columns");
            }
            for column in aggregator.columns() {
                display_column_maps(column);
            }
        }
    }

    Ok(())
}

/// Drain pending diagnostics to the terminal
fn report_warnings(warnings: &Receiver<Diagnostic>) {
    for diagnostic in warnings.try_iter() {
        print_warning(&diagnostic.to_string());
    }
}

fn print_step_time(start: Instant) {
    println!(
        "      {}",
        style(format!("⏱ {:.2}s", start.elapsed().as_secs_f64())).dim()
    );
}
