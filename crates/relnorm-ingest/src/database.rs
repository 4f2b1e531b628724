//! Whole-database loading and writing.

use std::path::{Path, PathBuf};

use relnorm_model::{Database, NormalizedDatabase};

use crate::csv::{read_csv_table, write_csv_table};
use crate::discovery::{list_csv_files, table_type_for};
use crate::error::{IngestError, Result};

/// Load every `*.csv` in `dir` as one input table of the type its name
/// starts with (see [`table_type_for`]).
///
/// Files are read in filename order, so a type's tables keep that order.
pub fn load_database(dir: &Path) -> Result<Database> {
    let mut database = Database::new();
    for path in list_csv_files(dir)? {
        let table_type = table_type_for(&path)?;
        let table = read_csv_table(&path)?;
        database.entry(table_type).or_default().push(table);
    }
    tracing::info!(
        path = %dir.display(),
        types = database.len(),
        tables = database.values().map(Vec::len).sum::<usize>(),
        "loaded input database"
    );
    Ok(database)
}

/// Write each table to `{dir}/{type}.csv`, creating `dir` if needed.
///
/// Returns the written paths in type order.
pub fn save_database(database: &NormalizedDatabase, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| IngestError::DirectoryCreate {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut written = Vec::with_capacity(database.len());
    for (table_type, table) in database {
        let path = dir.join(format!("{table_type}.csv"));
        write_csv_table(table, &path)?;
        written.push(path);
    }
    tracing::info!(path = %dir.display(), tables = written.len(), "wrote normalized database");
    Ok(written)
}
