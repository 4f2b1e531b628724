//! Database containers passed into and out of the engine.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;

/// Raw input: entity type name to the tables read for it.
///
/// One entry per source file; the caller shards and concatenates across
/// files, the engine never looks at where a table came from.
pub type Database = BTreeMap<String, Vec<DataFrame>>;

/// Intermediate output of a splitting pass: entity type to table fragments.
pub type FragmentDatabase = BTreeMap<String, Vec<DataFrame>>;

/// Final output: one consolidated table per entity type.
pub type NormalizedDatabase = BTreeMap<String, DataFrame>;

/// Build a `Database` holding a single table per type.
pub fn single_table_database<I, S>(tables: I) -> Database
where
    I: IntoIterator<Item = (S, DataFrame)>,
    S: Into<String>,
{
    let mut database = Database::new();
    for (table_type, table) in tables {
        database.entry(table_type.into()).or_default().push(table);
    }
    database
}

/// Total number of rows across every table in a database.
pub fn row_count(database: &Database) -> usize {
    database
        .values()
        .flat_map(|tables| tables.iter())
        .map(DataFrame::height)
        .sum()
}
