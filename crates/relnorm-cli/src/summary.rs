use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use relnorm_model::NormalForm;
use relnorm_schema::SchemaRegistry;

use crate::types::{NormalizeResult, StatusOutcome, StatusResult};

pub fn print_summary(result: &NormalizeResult) {
    if result.written.is_empty() {
        println!("Output: {} (dry run)", result.output_dir.display());
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    if let Some(path) = &result.id_mapping {
        println!("Id mapping: {}", path.display());
    }
    if let Some(path) = &result.report_file {
        println!("Report: {}", path.display());
    }
    println!("{}", summary_table(result));
    if result.report.reused_ids > 0 {
        println!("Reused ids: {}", result.report.reused_ids);
    }
    if result.has_dropped_tables() {
        eprintln!("Dropped tables:");
        for dropped in &result.report.dropped_tables {
            eprintln!(
                "- {} #{}: {}",
                dropped.table_type, dropped.index, dropped.reason
            );
        }
    }
}

/// Per-type table of rows, columns and the counters the pass recorded.
pub fn summary_table(result: &NormalizeResult) -> Table {
    let report = &result.report;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Splits"),
        header_cell("Excluded"),
        header_cell("Merged"),
        header_cell("Enum violations"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let count = |counts: &std::collections::BTreeMap<String, usize>, table_type: &str| {
        counts.get(table_type).copied().unwrap_or(0)
    };
    let mut total_rows = 0usize;
    for summary in &result.tables {
        total_rows += summary.rows;
        table.add_row(vec![
            type_cell(&summary.table_type),
            Cell::new(summary.rows),
            Cell::new(summary.columns),
            count_cell(count(&report.splits, &summary.table_type), Color::Green),
            count_cell(
                count(&report.required_attribute_missing, &summary.table_type),
                Color::Yellow,
            ),
            count_cell(count(&report.deduplicated, &summary.table_type), Color::Green),
            count_cell(
                count(&report.enum_violations, &summary.table_type),
                Color::Red,
            ),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(report.splits.values().sum(), Color::Green).add_attribute(Attribute::Bold),
        count_cell(report.total_missing(), Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(report.total_deduplicated(), Color::Green).add_attribute(Attribute::Bold),
        count_cell(report.enum_violations.values().sum(), Color::Red)
            .add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn print_status(result: &StatusResult) {
    println!("{}", status_table(result));
}

pub fn status_table(result: &StatusResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("File"),
        header_cell("Rows"),
        header_cell("Level"),
        header_cell(&format!("Below {}", result.target)),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for status in &result.tables {
        let (level, below) = match &status.outcome {
            StatusOutcome::Classified(classified) => {
                let below = classified.prefixes_below(result.target);
                let below = if below.is_empty() {
                    dim_cell("-")
                } else {
                    Cell::new(below.join(", "))
                };
                (level_cell(classified.overall, result.target), below)
            }
            StatusOutcome::Invalid(reason) => (
                Cell::new("invalid")
                    .fg(Color::Red)
                    .add_attribute(Attribute::Bold),
                Cell::new(reason).fg(Color::Red),
            ),
        };
        table.add_row(vec![
            type_cell(&status.table_type),
            Cell::new(status.index),
            Cell::new(status.rows),
            level,
            below,
        ]);
    }
    table
}

/// Plain-text rendering of every classified table, one block per input file.
pub fn status_text(result: &StatusResult) -> String {
    let mut text = String::new();
    for status in &result.tables {
        match &status.outcome {
            StatusOutcome::Classified(classified) => text.push_str(&classified.to_string()),
            StatusOutcome::Invalid(reason) => {
                text.push_str(&format!("{}: invalid ({reason})\n", status.table_type));
            }
        }
    }
    text
}

pub fn print_schema(registry: &SchemaRegistry) {
    println!("Inheritance: {}", registry.mode());
    println!("{}", schema_table(registry));
}

pub fn schema_table(registry: &SchemaRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("Parent"),
        header_cell("Attributes"),
        header_cell("Forward relations"),
        header_cell("Multivalued"),
        header_cell("Repeating"),
        header_cell("Required"),
    ]);
    apply_table_style(&mut table);
    for schema in registry.schemas() {
        let relations = |map: &std::collections::BTreeMap<String, String>| {
            join_or_dash(map.iter().map(|(name, target)| format!("{name} -> {target}")))
        };
        table.add_row(vec![
            type_cell(schema.name()),
            schema.parent_type().map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(join_or_dash(schema.attributes().iter().cloned())),
            Cell::new(relations(schema.forward_relations())),
            Cell::new(relations(schema.multivalued_columns())),
            Cell::new(join_or_dash(schema.repeating_columns().iter().cloned())),
            Cell::new(join_or_dash(schema.required_attributes().iter().cloned())),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn join_or_dash<I>(values: I) -> String
where
    I: Iterator<Item = String>,
{
    let joined = values.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn type_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn level_cell(level: NormalForm, target: NormalForm) -> Cell {
    if level >= target {
        Cell::new(level).fg(Color::Green)
    } else {
        Cell::new(level).fg(Color::Yellow)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
