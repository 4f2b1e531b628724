//! Fragment consolidation and post-split table rewrites.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{BooleanChunked, DataFrame, NewChunkedArray, PolarsResult};

use relnorm_model::{FragmentDatabase, ID_COLUMN, InheritanceMode, NormalizedDatabase};
use relnorm_schema::SchemaRegistry;

use crate::error::Result;
use crate::frame::{
    cell_text, column_names, concat_diagonal, drop_columns, gather_rows, move_to_front,
    string_column,
};

/// Concatenate every type's fragments into one table with `id` first.
pub fn consolidate(fragments: FragmentDatabase) -> Result<NormalizedDatabase> {
    let mut database = NormalizedDatabase::new();
    for (table_type, tables) in fragments {
        if tables.is_empty() {
            continue;
        }
        let count = tables.len();
        let table = move_to_front(&concat_diagonal(tables)?, ID_COLUMN)?;
        if let Ok(ids) = table.column(ID_COLUMN) {
            let distinct: BTreeSet<String> =
                (0..table.height()).filter_map(|row| cell_text(ids, row)).collect();
            if distinct.len() != table.height() {
                tracing::warn!(
                    table_type = %table_type,
                    rows = table.height(),
                    distinct_ids = distinct.len(),
                    "consolidated table has repeated ids"
                );
            }
        }
        tracing::debug!(
            table_type = %table_type,
            fragments = count,
            rows = table.height(),
            "consolidated fragments"
        );
        database.insert(table_type, table);
    }
    Ok(database)
}

/// Merge rows that agree on every column but `id`.
///
/// The first row of each group is kept and every reference to a dropped
/// id, whether a forward key or a back-reference, is rewritten to the kept
/// id. Rewriting references can make rows of an already visited type
/// identical, so passes over all types (in sorted order) repeat until one
/// removes nothing. Returns the number of rows removed per type.
pub fn safe_deduplicate(
    database: &mut NormalizedDatabase,
    registry: &SchemaRegistry,
) -> Result<BTreeMap<String, usize>> {
    let mut removed: BTreeMap<String, usize> = BTreeMap::new();
    let types: Vec<String> = database.keys().cloned().collect();

    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut changed = false;
        for table_type in &types {
            let dropped = deduplicate_type(database, registry, table_type)?;
            if dropped > 0 {
                *removed.entry(table_type.clone()).or_default() += dropped;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    tracing::debug!(
        passes,
        rows = removed.values().sum::<usize>(),
        "safe deduplication finished"
    );
    Ok(removed)
}

/// One dedupe of `table_type`, remapping references to it. Returns rows removed.
fn deduplicate_type(
    database: &mut NormalizedDatabase,
    registry: &SchemaRegistry,
    table_type: &str,
) -> Result<usize> {
    let Some(table) = database.get(table_type) else {
        return Ok(0);
    };
    let Ok(ids) = table.column(ID_COLUMN) else {
        return Ok(0);
    };
    let others: Vec<_> = table
        .get_columns()
        .iter()
        .filter(|column| column.name().as_str() != ID_COLUMN)
        .collect();

    let mut kept: BTreeMap<Vec<Option<String>>, Option<String>> = BTreeMap::new();
    let mut remap: BTreeMap<String, String> = BTreeMap::new();
    let mut keep = Vec::with_capacity(table.height());
    for row in 0..table.height() {
        let signature: Vec<Option<String>> =
            others.iter().map(|column| cell_text(column, row)).collect();
        let id = cell_text(ids, row);
        match kept.get(&signature) {
            None => {
                kept.insert(signature, id);
                keep.push(true);
            }
            Some(first) => {
                if let (Some(dropped), Some(first)) = (id, first) {
                    remap.insert(dropped, first.clone());
                }
                keep.push(false);
            }
        }
    }
    let dropped = keep.iter().filter(|kept| !**kept).count();
    if dropped == 0 {
        return Ok(0);
    }

    let mask = BooleanChunked::from_slice("dedupe".into(), &keep);
    let deduplicated = table.filter(&mask)?;
    database.insert(table_type.to_string(), deduplicated);
    for reference in registry.references_to(table_type) {
        if let Some(table) = database.get_mut(&reference.table_type) {
            remap_column(table, &reference.column, &remap)?;
        }
    }
    tracing::debug!(table_type = %table_type, rows = dropped, "merged duplicate rows");
    Ok(dropped)
}

fn remap_column(
    table: &mut DataFrame,
    column: &str,
    remap: &BTreeMap<String, String>,
) -> Result<()> {
    let Ok(values) = table.column(column) else {
        return Ok(());
    };
    let rewritten: Vec<Option<String>> = (0..table.height())
        .map(|row| {
            cell_text(values, row).map(|value| remap.get(&value).cloned().unwrap_or(value))
        })
        .collect();
    table.with_column(string_column(column, rewritten))?;
    Ok(())
}

/// Split single-table inheritance tables into class-table form.
///
/// Every descendant of a stored type gets its own table holding `id` plus
/// the attributes it declares itself, for the rows where any of those
/// attributes is set. Those columns leave the parent table, which keeps
/// every row.
pub fn to_class_table(
    database: &NormalizedDatabase,
    registry: &SchemaRegistry,
) -> Result<NormalizedDatabase> {
    let class_registry = registry.with_mode(InheritanceMode::ClassTable)?;
    let document = class_registry.document();
    let mut result = database.clone();

    for (table_type, table) in database {
        let descendants = document.descendants(table_type);
        if descendants.is_empty() {
            continue;
        }
        let present = column_names(table);
        let mut claimed_by_any: Vec<String> = Vec::new();

        for descendant in descendants {
            let schema = class_registry.resolve(descendant)?;
            let inherited: BTreeSet<&str> = document
                .ancestors(descendant)
                .into_iter()
                .filter_map(|ancestor| class_registry.get(ancestor))
                .flat_map(|ancestor| ancestor.attributes().iter().map(String::as_str))
                .collect();
            let claimed: Vec<String> = present
                .iter()
                .filter(|column| {
                    column.as_str() != ID_COLUMN
                        && schema.attributes().contains(column.as_str())
                        && !inherited.contains(column.as_str())
                })
                .cloned()
                .collect();
            if claimed.is_empty() {
                continue;
            }

            let columns = claimed
                .iter()
                .map(|name| table.column(name))
                .collect::<PolarsResult<Vec<_>>>()?;
            let rows: Vec<usize> = (0..table.height())
                .filter(|row| columns.iter().any(|column| cell_text(column, *row).is_some()))
                .collect();
            claimed_by_any.extend(claimed.iter().cloned());
            if rows.is_empty() {
                continue;
            }

            let selection: Vec<String> = std::iter::once(ID_COLUMN.to_string())
                .chain(claimed)
                .filter(|name| present.contains(name))
                .collect();
            let child = gather_rows(&table.select(selection)?, &rows)?;
            let merged = match result.remove(descendant) {
                Some(existing) => concat_diagonal(vec![existing, child])?,
                None => child,
            };
            tracing::debug!(
                table_type = %table_type,
                child_type = descendant,
                rows = merged.height(),
                "extracted class table"
            );
            result.insert(descendant.to_string(), move_to_front(&merged, ID_COLUMN)?);
        }

        if !claimed_by_any.is_empty() {
            result.insert(table_type.clone(), drop_columns(table, &claimed_by_any)?);
        }
    }
    Ok(result)
}
