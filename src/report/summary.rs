//! Aggregation summary tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{CategoryAggregator, ColumnAggregation};

/// Per-column figures shown after fitting or transforming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub column: String,
    pub rows: usize,
    pub threshold_value: usize,
    pub categories: usize,
    pub preserved: usize,
    pub absorbed: usize,
}

impl ColumnSummary {
    pub fn from_column(column: &ColumnAggregation) -> Self {
        Self {
            column: column.column().to_string(),
            rows: column.row_count(),
            threshold_value: column.threshold_value(),
            categories: column.known_categories(),
            preserved: column.preserved_categories().len(),
            absorbed: column.absorbed_count(),
        }
    }

    /// Categories mapped to Other, absorbed ones included
    pub fn collapsed(&self) -> usize {
        self.categories - self.preserved
    }
}

/// Summary of a fitted aggregator
#[derive(Debug, Default)]
pub struct AggregationSummary {
    pub columns: Vec<ColumnSummary>,
}

impl AggregationSummary {
    pub fn from_aggregator(aggregator: &CategoryAggregator) -> Self {
        Self {
            columns: aggregator
                .columns()
                .iter()
                .map(ColumnSummary::from_column)
                .collect(),
        }
    }

    pub fn total_absorbed(&self) -> usize {
        self.columns.iter().map(|c| c.absorbed).sum()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Column").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
            Cell::new("Budget").add_attribute(Attribute::Bold),
            Cell::new("Categories").add_attribute(Attribute::Bold),
            Cell::new("Kept").add_attribute(Attribute::Bold),
            Cell::new("→ Other").add_attribute(Attribute::Bold),
            Cell::new("Absorbed").add_attribute(Attribute::Bold),
        ]);

        for summary in &self.columns {
            table.add_row(vec![
                Cell::new(&summary.column),
                Cell::new(summary.rows),
                Cell::new(summary.threshold_value),
                Cell::new(summary.categories),
                Cell::new(summary.preserved).fg(Color::Green),
                Cell::new(summary.collapsed()).fg(if summary.collapsed() == 0 {
                    Color::White
                } else {
                    Color::Yellow
                }),
                Cell::new(summary.absorbed).fg(if summary.absorbed == 0 {
                    Color::White
                } else {
                    Color::Red
                }),
            ]);
        }

        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("AGGREGATION SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        if self.columns.is_empty() {
            println!("    No categorical columns aggregated");
            return;
        }

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
}

/// Table of one column's learned maps: raw value, target and frequency
pub fn column_map_table(column: &ColumnAggregation) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Value").add_attribute(Attribute::Bold),
        Cell::new("Target").add_attribute(Attribute::Bold),
        Cell::new("Frequency").add_attribute(Attribute::Bold),
    ]);

    for (value, target) in column.aggregation_map() {
        let kept = value == target;
        let frequency = column
            .frequency(&target)
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(value.to_string()),
            Cell::new(target.to_string()).fg(if kept { Color::Green } else { Color::Yellow }),
            Cell::new(frequency),
        ]);
    }

    table
}

/// Print one column's learned maps
pub fn display_column_maps(column: &ColumnAggregation) {
    println!();
    println!(
        "    {} {} {}",
        style("◆").cyan().bold(),
        style(column.column()).white().bold(),
        style(format!(
            "(rows: {}, budget: {})",
            column.row_count(),
            column.threshold_value()
        ))
        .dim()
    );
    for line in column_map_table(column).to_string().lines() {
        println!("    {}", line);
    }
}
