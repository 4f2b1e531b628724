//! CSV reading and writing with every column kept as text.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

/// Read a CSV file into a DataFrame of `String` columns.
///
/// Schema inference is disabled so raw ids such as `007` or `1.0` reach
/// the engine exactly as written. Empty fields read as null.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    let metadata = std::fs::metadata(path).map_err(|e| IngestError::FileAccess {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read CSV table"
    );
    Ok(df)
}

/// Write `df` to `path` with a header line, replacing any existing file.
pub fn write_csv_table(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| IngestError::FileAccess {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut table = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut table)
        .map_err(|e| IngestError::CsvWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    tracing::debug!(path = %path.display(), rows = df.height(), "wrote CSV table");
    Ok(())
}
