//! CSV boundary for the normalization engine.
//!
//! An input directory holds one or more CSV files per entity type, named
//! after the type (`Transaction.csv`). Every column is read as text.

pub mod csv;
pub mod database;
pub mod discovery;
pub mod error;

pub use csv::{read_csv_table, write_csv_table};
pub use database::{load_database, save_database};
pub use discovery::{list_csv_files, table_type_for};
pub use error::{IngestError, Result};
