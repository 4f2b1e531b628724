use std::path::PathBuf;

use relnorm_core::{NormalizationReport, NormalizationStatus};
use relnorm_model::NormalForm;

#[derive(Debug)]
pub struct NormalizeResult {
    pub output_dir: PathBuf,
    /// Files written; empty on a dry run.
    pub written: Vec<PathBuf>,
    pub tables: Vec<TableSummary>,
    pub report: NormalizationReport,
    pub id_mapping: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
}

impl NormalizeResult {
    pub fn has_dropped_tables(&self) -> bool {
        !self.report.dropped_tables.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table_type: String,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug)]
pub struct StatusResult {
    pub target: NormalForm,
    pub tables: Vec<TableStatus>,
}

#[derive(Debug)]
pub struct TableStatus {
    pub table_type: String,
    /// Position among the type's input files.
    pub index: usize,
    pub rows: usize,
    pub outcome: StatusOutcome,
}

#[derive(Debug)]
pub enum StatusOutcome {
    Classified(NormalizationStatus),
    Invalid(String),
}
