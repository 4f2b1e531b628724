//! Shared vocabulary for schema-driven relational normalization.
//!
//! Column names of denormalized input tables encode embedded relationships
//! (`donor--name`, `address--city`, `amount-2`). This crate holds the types
//! every stage agrees on: normal-form levels, resolved column tokens, the
//! error taxonomy and the database containers.

pub mod database;
pub mod error;
pub mod form;
pub mod token;

pub use database::{Database, FragmentDatabase, NormalizedDatabase, row_count, single_table_database};
pub use error::{Result, SchemaError, SchemaViolationError, ViolationReason};
pub use form::{InheritanceMode, NormalForm};
pub use token::{
    ColumnToken, ID_COLUMN, ID_SUFFIX, REPEAT_SEPARATOR, SPLIT, first_token, prefixed,
    relation_id_column, split_repeating, strip_relation_prefix, tokens,
};
