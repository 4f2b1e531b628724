//! DataFrame helpers for row-level work.
//!
//! The engine reads individual cells as text and rebuilds whole columns,
//! which keeps every split independent of the input column dtypes.

use std::collections::BTreeMap;

use polars::prelude::{
    AnyValue, Column, DataFrame, DataType, IdxCa, IdxSize, IntoColumn, NamedFrom,
    NewChunkedArray, PolarsResult, Series,
};

/// Render a cell as text. `Null` renders as an empty string.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(value) => value.to_string(),
        AnyValue::StringOwned(value) => value.to_string(),
        AnyValue::Float64(value) => format_numeric(value),
        AnyValue::Float32(value) => format_numeric(f64::from(value)),
        value => value.to_string(),
    }
}

/// Numeric view of a cell; strings are parsed.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Float32(value) => Some(f64::from(value)),
        AnyValue::Float64(value) => Some(value),
        AnyValue::Int8(value) => Some(f64::from(value)),
        AnyValue::Int16(value) => Some(f64::from(value)),
        AnyValue::Int32(value) => Some(f64::from(value)),
        AnyValue::Int64(value) => Some(value as f64),
        AnyValue::UInt8(value) => Some(f64::from(value)),
        AnyValue::UInt16(value) => Some(f64::from(value)),
        AnyValue::UInt32(value) => Some(f64::from(value)),
        AnyValue::UInt64(value) => Some(value as f64),
        AnyValue::String(value) => parse_f64(value),
        AnyValue::StringOwned(value) => parse_f64(&value),
        _ => None,
    }
}

/// 2^63: whole floats in `[-2^63, 2^63)` convert to `i64` exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Text of a number, without a trailing `.0` for whole values.
pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&value) {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Text of a cell, or `None` for nulls and blank strings.
pub fn cell_text(column: &Column, row: usize) -> Option<String> {
    let value = column.get(row).ok()?;
    if matches!(value, AnyValue::Null) {
        return None;
    }
    let text = any_to_string(value);
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Like [`cell_text`], looking the column up by name. Missing columns read as null.
pub fn cell_text_by_name(df: &DataFrame, column: &str, row: usize) -> Option<String> {
    df.column(column).ok().and_then(|column| cell_text(column, row))
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// A nullable string column.
pub fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Series::new(name.into(), values).into_column()
}

/// Rows of `df` at `rows`, in that order.
pub fn gather_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let indices: Vec<IdxSize> = rows.iter().map(|&row| row as IdxSize).collect();
    df.take(&IdxCa::from_vec("rows".into(), indices))
}

/// `df` without the named columns. Names that are not present are ignored.
pub fn drop_columns(df: &DataFrame, names: &[String]) -> PolarsResult<DataFrame> {
    let keep: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| !names.contains(name))
        .collect();
    df.select(keep)
}

/// Reorder so `name` comes first, if present.
pub fn move_to_front(df: &DataFrame, name: &str) -> PolarsResult<DataFrame> {
    let names = column_names(df);
    if names.first().map(String::as_str) == Some(name) || !names.iter().any(|n| n == name) {
        return Ok(df.clone());
    }
    let ordered: Vec<String> = std::iter::once(name.to_string())
        .chain(names.into_iter().filter(|n| n != name))
        .collect();
    df.select(ordered)
}

/// Concatenate frames over the union of their columns.
///
/// Columns keep first-seen order. Missing columns are filled with nulls and
/// columns whose dtypes disagree are cast to `String`.
pub fn concat_diagonal(frames: Vec<DataFrame>) -> PolarsResult<DataFrame> {
    let mut order: Vec<String> = Vec::new();
    let mut dtypes: BTreeMap<String, DataType> = BTreeMap::new();
    for frame in &frames {
        for column in frame.get_columns() {
            let name = column.name().to_string();
            let dtype = column.dtype();
            match dtypes.get(&name) {
                None => {
                    order.push(name.clone());
                    dtypes.insert(name, dtype.clone());
                }
                Some(existing) if existing == dtype || *dtype == DataType::Null => {}
                Some(DataType::Null) => {
                    dtypes.insert(name, dtype.clone());
                }
                Some(_) => {
                    dtypes.insert(name, DataType::String);
                }
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for frame in frames {
        let height = frame.height();
        let columns = order
            .iter()
            .map(|name| {
                let dtype = &dtypes[name];
                match frame.column(name) {
                    Ok(column) if column.dtype() == dtype => Ok(column.clone()),
                    Ok(column) => column.cast(dtype),
                    Err(_) => Ok(Column::full_null(name.as_str().into(), height, dtype)),
                }
            })
            .collect::<PolarsResult<Vec<Column>>>()?;
        let aligned = DataFrame::new(columns)?;
        match combined.as_mut() {
            None => combined = Some(aligned),
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
        }
    }
    Ok(combined.unwrap_or_default())
}
