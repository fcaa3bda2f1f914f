//! Tests for frequency-based category aggregation

use std::sync::Arc;

use featagg::pipeline::{
    AggregatorConfig, Category, CategoryAggregator, Diagnostic, Diagnostics,
    MissingFrequencyPolicy, PipelineError, Transformer, OTHER,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn aggregator(columns: &[&str], threshold: f64) -> CategoryAggregator {
    CategoryAggregator::new(AggregatorConfig::new(columns.iter().copied()).with_threshold(threshold))
        .unwrap()
}

fn strings(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[test]
fn test_threshold_boundary_table() {
    let df = counts_dataframe("col", &[("value1", 60), ("value2", 30), ("value3", 10)]);
    let mut agg = aggregator(&["col"], 0.85);
    agg.fit(&df).unwrap();

    assert_eq!(agg.threshold_value("col"), Some(85));
    assert_eq!(
        agg.aggregation_map("col").unwrap(),
        vec![
            (Category::from("value1"), Category::from("value1")),
            (Category::from("value2"), Category::from("value2")),
            (Category::from("value3"), Category::other()),
        ]
    );
    assert_eq!(
        agg.frequency_map("col").unwrap(),
        vec![
            (Category::from("value1"), 60),
            (Category::from("value2"), 30),
            (Category::other(), 10),
        ]
    );
}

#[test]
fn test_color_scenario() {
    let df = counts_dataframe("Color", &[("red", 6), ("blue", 3), ("green", 1)]);
    let mut agg = aggregator(&["Color"], 0.9);

    let out = agg.fit_transform(&df).unwrap();

    assert_eq!(agg.threshold_value("Color"), Some(9));
    let mut expected = vec![Some("red".to_string()); 6];
    expected.extend(vec![Some("blue".to_string()); 3]);
    expected.push(Some(OTHER.to_string()));
    assert_eq!(column_strings(&out, "Color"), expected);
    assert!(matches!(
        out.column("Color").unwrap().dtype(),
        DataType::Categorical(_, _)
    ));

    assert_eq!(
        agg.frequency_map("Color").unwrap(),
        vec![
            (Category::from("red"), 6),
            (Category::from("blue"), 3),
            (Category::other(), 1),
        ]
    );
}

#[test]
fn test_ties_broken_by_first_appearance() {
    // b and a both appear twice; b is seen first so it is walked first
    let df = df! { "col" => ["b", "a", "b", "a", "c"] }.unwrap();
    let mut agg = aggregator(&["col"], 0.4);
    agg.fit(&df).unwrap();

    assert_eq!(agg.threshold_value("col"), Some(2));
    assert_eq!(
        agg.preserved_categories("col").unwrap(),
        vec![Category::from("b")]
    );
}

#[test]
fn test_degenerate_threshold_warns_but_completes() {
    let diagnostics = Diagnostics::new();
    let warnings = diagnostics.subscribe();
    let df = counts_dataframe("col", &[("a", 9), ("b", 1)]);
    let mut agg = aggregator(&["col"], 0.5).with_diagnostics(diagnostics);

    let out = agg.fit_transform(&df).unwrap();

    let received: Vec<Diagnostic> = warnings.try_iter().collect();
    assert!(received.iter().any(|d| matches!(
        d,
        Diagnostic::DegenerateAggregation { top_count: 9, threshold_value: 5, .. }
    )));
    assert_shape(&out, 10, 1);
}

#[test]
fn test_unseen_values_absorbed_permanently() {
    let diagnostics = Diagnostics::new();
    let warnings = diagnostics.subscribe();
    let fit_df = df! { "col" => ["A", "A", "B", "A", "B"] }.unwrap();
    let mut agg = aggregator(&["col"], 1.0).with_diagnostics(diagnostics);
    agg.fit(&fit_df).unwrap();

    let batch = df! { "col" => ["A", "B", "C"] }.unwrap();
    let first = agg.transform(&batch).unwrap();
    let second = agg.transform(&batch).unwrap();

    assert_eq!(column_strings(&first, "col"), strings(&["A", "B", OTHER]));
    assert_eq!(column_strings(&second, "col"), column_strings(&first, "col"));

    let column = agg.column("col").unwrap();
    assert_eq!(column.absorbed_count(), 1);
    assert_eq!(column.target(&Category::from("C")), Some(Category::other()));

    let unseen: Vec<Diagnostic> = warnings
        .try_iter()
        .filter(|d| matches!(d, Diagnostic::UnseenCategory { .. }))
        .collect();
    assert_eq!(unseen.len(), 1, "absorption should only be reported once");
}

#[test]
fn test_refit_discards_absorbed_values() {
    let fit_df = df! { "col" => ["A", "B"] }.unwrap();
    let mut agg = aggregator(&["col"], 1.0);
    agg.fit(&fit_df).unwrap();
    agg.transform(&df! { "col" => ["C"] }.unwrap()).unwrap();
    assert_eq!(agg.column("col").unwrap().absorbed_count(), 1);

    agg.fit(&fit_df).unwrap();

    assert_eq!(agg.column("col").unwrap().absorbed_count(), 0);
    assert_eq!(agg.column("col").unwrap().target(&Category::from("C")), None);
}

#[test]
fn test_transform_missing_column_fails() {
    let mut agg = aggregator(&["Color", "Route"], 0.9);
    agg.fit(&create_citation_dataframe()).unwrap();

    let df = create_citation_dataframe().drop("Route").unwrap();
    match agg.transform(&df) {
        Err(PipelineError::MissingColumn { column }) => assert_eq!(column, "Route"),
        other => panic!("expected MissingColumn, got {:?}", other.map(|df| df.shape())),
    }
}

#[test]
fn test_transform_before_fit_fails() {
    let agg = aggregator(&["Color"], 0.9);
    assert!(matches!(
        agg.transform(&create_citation_dataframe()),
        Err(PipelineError::NotFitted { .. })
    ));
}

#[test]
fn test_fit_on_empty_batch_fails() {
    let df = DataFrame::new(vec![Column::new("Color".into(), Vec::<&str>::new())]).unwrap();
    let mut agg = aggregator(&["Color"], 0.9);
    assert!(matches!(
        agg.fit(&df),
        Err(PipelineError::EmptyColumn { ref column }) if column == "Color"
    ));
}

#[test]
fn test_numeric_encoding_reproduces_fit_counts() {
    let df = create_citation_dataframe();
    let config = AggregatorConfig::new(["Color", "Route"])
        .with_threshold(0.9)
        .with_convert_to_numeric(true);
    let mut agg = CategoryAggregator::new(config).unwrap();
    agg.fit(&df).unwrap();

    let out = agg.transform(&df).unwrap();

    for name in ["Color", "Route"] {
        let column = agg.column(name).unwrap();
        let raw = column_strings(&df, name);
        let encoded = column_f64(&out, name);
        for (value, freq) in raw.iter().zip(encoded) {
            let category = Category::from(value.as_deref());
            let target = column.target(&category).unwrap();
            assert_eq!(freq, column.frequency(&target).map(|c| c as f64));
        }
    }

    // Color: red 6, blue 3, green collapsed to Other 1
    let colors = column_f64(&out, "Color");
    assert_eq!(colors[0], Some(6.0));
    assert_eq!(colors[2], Some(3.0));
    assert_eq!(colors[9], Some(1.0));
}

#[test]
fn test_missing_values_form_their_own_bucket() {
    let df = df! { "col" => [None, None, None, Some("a"), Some("b")] }.unwrap();
    let mut agg = aggregator(&["col"], 0.7);
    agg.fit(&df).unwrap();

    assert_eq!(agg.threshold_value("col"), Some(3));
    assert_eq!(
        agg.frequency_map("col").unwrap(),
        vec![(Category::Missing, 3), (Category::other(), 2)]
    );

    let out = agg.transform(&df).unwrap();
    assert_eq!(
        column_strings(&out, "col"),
        vec![None, None, None, Some(OTHER.to_string()), Some(OTHER.to_string())]
    );
}

#[test]
fn test_unknown_frequency_defaults_to_zero() {
    let diagnostics = Diagnostics::new();
    let warnings = diagnostics.subscribe();
    let config = AggregatorConfig::new(["col"])
        .with_threshold(1.0)
        .with_convert_to_numeric(true);
    let mut agg = CategoryAggregator::new(config).unwrap().with_diagnostics(diagnostics);
    agg.fit(&df! { "col" => ["A", "A", "B"] }.unwrap()).unwrap();

    let out = agg.transform(&df! { "col" => ["A", "C"] }.unwrap()).unwrap();

    assert_eq!(column_f64(&out, "col"), vec![Some(2.0), Some(0.0)]);
    assert!(warnings
        .try_iter()
        .any(|d| matches!(d, Diagnostic::UnknownFrequency { .. })));
}

#[test]
fn test_unknown_frequency_error_policy_leaves_state_untouched() {
    let config = AggregatorConfig::new(["col"])
        .with_threshold(1.0)
        .with_convert_to_numeric(true)
        .with_missing_frequency(MissingFrequencyPolicy::Error);
    let mut agg = CategoryAggregator::new(config).unwrap();
    agg.fit(&df! { "col" => ["A", "A", "B"] }.unwrap()).unwrap();

    let err = agg.transform(&df! { "col" => ["A", "C"] }.unwrap()).unwrap_err();

    assert!(matches!(err, PipelineError::UnknownFrequency { .. }));
    assert_eq!(agg.column("col").unwrap().absorbed_count(), 0);
}

#[test]
fn test_unconfigured_columns_pass_through() {
    let df = create_citation_dataframe();
    let mut agg = aggregator(&["Color"], 0.9);

    let out = agg.fit_transform(&df).unwrap();

    assert_column_order(&out, &["Ticket", "IssueDate", "Fine", "Color", "Route"]);
    assert_eq!(out.column("Fine").unwrap().dtype(), &DataType::String);
    assert_eq!(column_strings(&out, "Fine"), column_strings(&df, "Fine"));
    assert_eq!(column_strings(&out, "Route"), column_strings(&df, "Route"));
}

#[test]
fn test_fit_then_transform_is_deterministic() {
    let df = create_citation_dataframe();
    let mut agg = aggregator(&["Color", "Route"], 0.8);
    agg.fit(&df).unwrap();

    let first = agg.transform(&df).unwrap();
    let second = agg.transform(&df).unwrap();

    for name in ["Color", "Route"] {
        assert_eq!(column_strings(&first, name), column_strings(&second, name));
    }
}

#[test]
fn test_concurrent_transforms_share_absorbed_state() {
    let mut agg = aggregator(&["col"], 1.0);
    agg.fit(&df! { "col" => ["A", "B"] }.unwrap()).unwrap();
    let agg = Arc::new(agg);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let agg = Arc::clone(&agg);
            scope.spawn(move || {
                let label = format!("new{}", i % 4);
                let batch = df! { "col" => ["A", label.as_str()] }.unwrap();
                let out = agg.transform(&batch).unwrap();
                assert_eq!(column_strings(&out, "col")[1].as_deref(), Some(OTHER));
            });
        }
    });

    assert_eq!(agg.column("col").unwrap().absorbed_count(), 4);
}
