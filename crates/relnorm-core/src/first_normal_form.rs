//! Repeating-group elimination.
//!
//! `amount-1, amount-2, memo-1, memo-2` become one `amount, memo` pair per
//! filled instance, each instance repeating the row's static columns.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, IntoColumn, NewChunkedArray, PolarsResult, Series,
};

use relnorm_model::split_repeating;
use relnorm_schema::EntityTypeSchema;

use crate::frame::{any_to_f64, cell_text, column_names, gather_rows};

/// Default presence column: repeating slots without a positive amount are empty.
pub const DEFAULT_PRESENCE_COLUMN: &str = "amount";

/// Unpivot repeating column groups into rows.
///
/// Returns the table unchanged when it has no repeating columns. Otherwise
/// an unsuffixed `base` column next to `base-N` columns becomes the next
/// instance, instances whose repeating values are all null are dropped, and,
/// when `presence_column` is present in the result, rows whose presence
/// value is null or not positive are dropped too.
pub fn to_first_normal_form(
    table: &DataFrame,
    schema: &EntityTypeSchema,
    presence_column: Option<&str>,
) -> PolarsResult<DataFrame> {
    let names = column_names(table);
    let mut groups: BTreeMap<String, BTreeMap<u32, String>> = BTreeMap::new();
    for name in &names {
        if schema.repeating_columns_regex().is_match(name)
            && let Some((base, instance)) = split_repeating(name)
        {
            groups
                .entry(base.to_string())
                .or_default()
                .insert(instance, name.clone());
        }
    }
    if groups.is_empty() {
        return Ok(table.clone());
    }

    // A bare `amount` beside `amount-1..N` is instance N+1.
    let mut renamed_bases: BTreeSet<String> = BTreeSet::new();
    for (base, instances) in &mut groups {
        if names.iter().any(|name| name == base) {
            let next = instances.keys().next_back().copied().unwrap_or(0) + 1;
            instances.insert(next, base.clone());
            renamed_bases.insert(base.clone());
        }
    }

    let static_columns: Vec<String> = names
        .iter()
        .filter(|name| {
            !renamed_bases.contains(name.as_str())
                && !groups
                    .values()
                    .any(|instances| instances.values().any(|column| column == *name))
        })
        .cloned()
        .collect();
    let all_instances: BTreeSet<u32> = groups
        .values()
        .flat_map(|instances| instances.keys().copied())
        .collect();

    let mut picked: Vec<(usize, u32)> = Vec::new();
    for row in 0..table.height() {
        for instance in &all_instances {
            let filled = groups.values().any(|instances| {
                instances
                    .get(instance)
                    .and_then(|column| table.column(column).ok())
                    .and_then(|column| cell_text(column, row))
                    .is_some()
            });
            if filled {
                picked.push((row, *instance));
            }
        }
    }

    let rows: Vec<usize> = picked.iter().map(|(row, _)| *row).collect();
    let mut result = gather_rows(&table.select(static_columns)?, &rows)?;
    if result.width() == 0 {
        result = DataFrame::empty_with_height(rows.len());
    }
    for (base, instances) in &groups {
        let mut values: Vec<AnyValue<'_>> = Vec::with_capacity(picked.len());
        for (row, instance) in &picked {
            let value = match instances.get(instance) {
                Some(column) => table.column(column)?.get(*row)?,
                None => AnyValue::Null,
            };
            values.push(value);
        }
        let series = Series::from_any_values(base.as_str().into(), &values, false)?;
        result.with_column(series.into_column())?;
    }

    if let Some(presence) = presence_column
        && result.column(presence).is_ok()
    {
        let column = result.column(presence)?;
        let keep: Vec<bool> = (0..result.height())
            .map(|row| {
                column
                    .get(row)
                    .ok()
                    .and_then(any_to_f64)
                    .is_some_and(|value| value > 0.0)
            })
            .collect();
        let mask = BooleanChunked::from_slice("present".into(), &keep);
        result = result.filter(&mask)?;
    }

    tracing::debug!(
        table_type = schema.name(),
        input_rows = table.height(),
        output_rows = result.height(),
        groups = groups.len(),
        "converted repeating groups to 1NF"
    );
    Ok(result)
}
