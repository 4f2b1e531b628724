//! Error types for the normalization engine.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use relnorm_model::{SchemaError, SchemaViolationError};

/// Errors that can abort a normalization pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NormalizationError {
    // === Schema Errors ===
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A column token does not resolve against its entity type.
    #[error(transparent)]
    Violation(#[from] SchemaViolationError),

    /// Input database holds tables for a type the schema does not declare.
    #[error("no schema for table type '{table_type}'")]
    UnknownTableType { table_type: String },

    // === Identifier Errors ===
    /// A relation split needs the origin rows' ids.
    #[error("table of type '{table_type}' has no 'id' column")]
    MissingIdColumn { table_type: String },

    /// One foreign key was seen embedding two different records.
    #[error(
        "conflicting records for {table_type} id '{id}' referenced through '{column}' in {origin_type}"
    )]
    ConflictingForeignKey {
        origin_type: String,
        column: String,
        table_type: String,
        id: String,
    },

    /// Id mapping file could not be read or written.
    #[error("failed to access id mapping {path}: {source}")]
    IdMappingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Id mapping file is not valid JSON of the expected shape.
    #[error("invalid id mapping {path}: {source}")]
    IdMappingFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // === DataFrame Errors ===
    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl NormalizationError {
    /// Whether a `DropTable` policy may skip the offending table and continue.
    pub fn is_table_violation(&self) -> bool {
        matches!(
            self,
            NormalizationError::Violation(_) | NormalizationError::UnknownTableType { .. }
        )
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, NormalizationError>;
