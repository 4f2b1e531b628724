//! Per-pass counters.

use std::collections::BTreeMap;

use serde::Serialize;

/// An input table skipped under `ViolationPolicy::DropTable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedTable {
    pub table_type: String,
    /// Position of the table in its type's input list.
    pub index: usize,
    pub reason: String,
}

/// What a normalization pass did besides producing tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    /// Rows across all input tables before 1NF.
    pub input_rows: usize,
    /// Relation groups split off, by derived type.
    pub splits: BTreeMap<String, usize>,
    /// Would-be derived rows excluded for lacking required attributes, by type.
    pub required_attribute_missing: BTreeMap<String, usize>,
    /// Forward-relation rows that reused an id from an identical earlier record.
    pub reused_ids: usize,
    /// Rows merged away by safe deduplication, by type.
    pub deduplicated: BTreeMap<String, usize>,
    /// Values outside their enum column's allowed set, by type.
    pub enum_violations: BTreeMap<String, usize>,
    pub dropped_tables: Vec<DroppedTable>,
    /// Post-consolidation steps that ran, in order.
    pub executed_steps: Vec<String>,
}

impl NormalizationReport {
    pub(crate) fn record_split(&mut self, table_type: &str) {
        *self.splits.entry(table_type.to_string()).or_default() += 1;
    }

    pub(crate) fn record_missing(&mut self, table_type: &str, rows: usize) {
        Self::record_count(&mut self.required_attribute_missing, table_type, rows);
    }

    pub(crate) fn record_count(counts: &mut BTreeMap<String, usize>, table_type: &str, rows: usize) {
        if rows > 0 {
            *counts.entry(table_type.to_string()).or_default() += rows;
        }
    }

    pub fn total_missing(&self) -> usize {
        self.required_attribute_missing.values().sum()
    }

    pub fn total_deduplicated(&self) -> usize {
        self.deduplicated.values().sum()
    }
}
