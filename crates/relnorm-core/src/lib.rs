//! Schema-driven normalization of denormalized tables.
//!
//! Tables arrive with compound column names such as `donor--name` or
//! `amount-2`. The [`analyzer`] classifies every column against a resolved
//! entity type, [`first_normal_form`] unpivots repeating groups, [`ids`]
//! assigns surrogate keys and [`split`] extracts embedded relations into
//! tables of their own. [`consolidate`] merges the fragments, and
//! [`pipeline`] drives the whole pass over a [`relnorm_model::Database`].

pub mod analyzer;
pub mod consolidate;
pub mod error;
pub mod first_normal_form;
pub mod frame;
pub mod ids;
pub mod options;
pub mod pipeline;
pub mod report;
pub mod split;

pub use analyzer::{
    EnumViolation, NormalizationStatus, classify, classify_columns, column_level, validate_enums,
};
pub use consolidate::{consolidate, safe_deduplicate, to_class_table};
pub use error::{NormalizationError, Result};
pub use first_normal_form::{DEFAULT_PRESENCE_COLUMN, to_first_normal_form};
pub use ids::{
    IdGenerator, IdKey, IdMapping, SequentialIdGenerator, UuidGenerator, assign_ids, is_uuid,
};
pub use options::{NormalizeOptions, ViolationPolicy};
pub use pipeline::{
    DatabasePipeline, DatabaseStep, Normalized, Normalizer, StepContext, build_default_pipeline,
    normalize_database,
};
pub use report::{DroppedTable, NormalizationReport};
pub use split::{NormalizationPass, SplitOutcome};
