//! Configuration options for a normalization pass.

use serde::{Deserialize, Serialize};

use relnorm_model::{InheritanceMode, NormalForm};

use crate::first_normal_form::DEFAULT_PRESENCE_COLUMN;

/// What to do with an input table whose columns do not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViolationPolicy {
    /// Fail the whole pass.
    #[default]
    Abort,
    /// Log, record the table in the report and continue without it.
    DropTable,
}

/// Options controlling a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Lowest normal form every output table must reach.
    pub target: NormalForm,

    /// How parent and child entity types share tables.
    pub inheritance: InheritanceMode,

    /// Merge rows identical in everything but `id` after consolidation.
    ///
    /// Changes row counts, so only safe before ids are referenced outside
    /// the produced database.
    pub safe_dedupe: bool,

    pub violation_policy: ViolationPolicy,

    /// Column whose null or non-positive value marks an empty repeating slot.
    pub presence_column: Option<String>,

    /// Columns copied from an origin row into the rows split off it, when
    /// the derived type declares them.
    pub carry_columns: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            target: NormalForm::FourthNormalForm,
            inheritance: InheritanceMode::SingleTable,
            safe_dedupe: false,
            violation_policy: ViolationPolicy::Abort,
            presence_column: Some(DEFAULT_PRESENCE_COLUMN.to_string()),
            carry_columns: Vec::new(),
        }
    }
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: NormalForm) -> Self {
        self.target = target;
        self
    }

    pub fn with_inheritance(mut self, inheritance: InheritanceMode) -> Self {
        self.inheritance = inheritance;
        self
    }

    pub fn with_safe_dedupe(mut self, enable: bool) -> Self {
        self.safe_dedupe = enable;
        self
    }

    pub fn with_violation_policy(mut self, policy: ViolationPolicy) -> Self {
        self.violation_policy = policy;
        self
    }

    pub fn with_presence_column(mut self, column: Option<String>) -> Self {
        self.presence_column = column;
        self
    }

    pub fn with_carry_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.carry_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}
