//! Error taxonomy shared by the schema model and the normalization engine.

use std::path::PathBuf;
use thiserror::Error;

/// A malformed, cyclic or inconsistent schema document.
///
/// Raised at load time and never recovered.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// Schema document could not be read.
    #[error("failed to read schema {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema document could not be parsed.
    #[error("failed to parse schema: {message}")]
    Parse { message: String },

    /// Schema file extension is not a supported encoding.
    #[error("unsupported schema format '{extension}' (expected yaml, yml or json)")]
    UnsupportedFormat { extension: String },

    /// One or more consistency checks failed.
    #[error("schema validation failed:\n{}", .problems.join("\n"))]
    Invalid { problems: Vec<String> },

    /// A name was looked up that the document does not declare.
    #[error("unknown entity type '{name}'")]
    UnknownType { name: String },

    /// A column-name matcher failed to compile.
    #[error("invalid pattern for {table_type}: {message}")]
    Pattern { table_type: String, message: String },
}

impl SchemaError {
    /// Individual problems reported by validation (empty for other variants).
    pub fn problems(&self) -> &[String] {
        match self {
            SchemaError::Invalid { problems } => problems,
            _ => &[],
        }
    }
}

/// Why a column could not be resolved against its entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// Token is not an attribute, relation or repeating column.
    UnknownToken,
    /// An attribute token was followed by further tokens.
    AttributeNotTerminal,
    /// A relation token ended the path without reaching an attribute.
    IncompleteRelationPath,
}

impl ViolationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationReason::UnknownToken => "not expected",
            ViolationReason::AttributeNotTerminal => "is an attribute and must be terminal",
            ViolationReason::IncompleteRelationPath => "names a relation but no attribute of it",
        }
    }
}

/// A table column contains a token that cannot be resolved.
#[derive(Debug, Clone, Error)]
#[error("invalid table: '{token}' in column '{column}' {} in {table_type}", .reason.as_str())]
pub struct SchemaViolationError {
    /// Entity type the offending token was resolved against.
    pub table_type: String,
    /// Full column path.
    pub column: String,
    /// Offending token.
    pub token: String,
    pub reason: ViolationReason,
}

/// Result alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_schema_lists_every_problem() {
        let error = SchemaError::Invalid {
            problems: vec![
                "Error in Person: parent 'Human' does not exist in schema.".to_string(),
                "Error in Person: enum_columns 'gender' must be listed in attributes.".to_string(),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("parent 'Human'"));
        assert!(message.contains("enum_columns 'gender'"));
        assert_eq!(error.problems().len(), 2);
    }

    #[test]
    fn violation_names_column_and_type() {
        let error = SchemaViolationError {
            table_type: "Transaction".to_string(),
            column: "donor--shoe_size".to_string(),
            token: "shoe_size".to_string(),
            reason: ViolationReason::UnknownToken,
        };
        assert_eq!(
            error.to_string(),
            "invalid table: 'shoe_size' in column 'donor--shoe_size' not expected in Transaction"
        );
    }
}
