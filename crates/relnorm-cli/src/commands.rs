use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use relnorm_core::{
    IdMapping, NormalizationReport, NormalizeOptions, Normalizer, ViolationPolicy, classify,
};
use relnorm_ingest::{load_database, save_database};
use relnorm_model::{InheritanceMode, NormalForm};
use relnorm_schema::SchemaRegistry;

use crate::cli::{NormalizeArgs, SchemaArgs, StatusArgs};
use crate::types::{NormalizeResult, StatusOutcome, StatusResult, TableStatus, TableSummary};

pub fn run_normalize(args: &NormalizeArgs) -> Result<NormalizeResult> {
    let span = info_span!("normalize", input = %args.input_dir.display());
    let _guard = span.enter();

    let registry = load_registry(&args.schema, InheritanceMode::SingleTable)?;
    let database = load_database(&args.input_dir)
        .with_context(|| format!("load tables from {}", args.input_dir.display()))?;
    let id_mapping = match &args.id_mapping {
        Some(path) => IdMapping::load(path)
            .with_context(|| format!("load id mapping {}", path.display()))?,
        None => IdMapping::new(),
    };

    let mut normalizer = Normalizer::new(&registry)
        .with_options(normalize_options(args))
        .with_id_mapping(id_mapping);
    let normalized = normalizer.run(&database).context("normalize tables")?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input_dir.join("normalized"));
    let written = if args.dry_run {
        Vec::new()
    } else {
        save_database(&normalized.database, &output_dir)
            .with_context(|| format!("write tables to {}", output_dir.display()))?
    };
    if let Some(path) = &args.id_mapping
        && !args.dry_run
    {
        normalizer
            .id_mapping()
            .save(path)
            .with_context(|| format!("save id mapping {}", path.display()))?;
    }
    if let Some(path) = &args.report {
        write_report(&normalized.report, path)?;
    }
    info!(
        tables = normalized.database.len(),
        written = written.len(),
        "normalize finished"
    );

    let tables = normalized
        .database
        .iter()
        .map(|(table_type, table)| TableSummary {
            table_type: table_type.clone(),
            rows: table.height(),
            columns: table.width(),
        })
        .collect();
    Ok(NormalizeResult {
        output_dir,
        written,
        tables,
        report: normalized.report,
        id_mapping: args.id_mapping.clone(),
        report_file: args.report.clone(),
    })
}

pub fn run_status(args: &StatusArgs) -> Result<StatusResult> {
    let registry = load_registry(&args.schema, InheritanceMode::SingleTable)?;
    let database = load_database(&args.input_dir)
        .with_context(|| format!("load tables from {}", args.input_dir.display()))?;

    let mut tables = Vec::new();
    for (table_type, inputs) in &database {
        for (index, table) in inputs.iter().enumerate() {
            let outcome = match registry.get(table_type) {
                None => StatusOutcome::Invalid(format!("unknown entity type {table_type}")),
                Some(schema) => match classify(table, schema, &registry) {
                    Ok(status) => StatusOutcome::Classified(status),
                    Err(violation) => StatusOutcome::Invalid(violation.to_string()),
                },
            };
            tables.push(TableStatus {
                table_type: table_type.clone(),
                index,
                rows: table.height(),
                outcome,
            });
        }
    }
    Ok(StatusResult {
        target: NormalForm::from(args.target),
        tables,
    })
}

pub fn run_schema(args: &SchemaArgs) -> Result<SchemaRegistry> {
    load_registry(&args.schema, InheritanceMode::from(args.inheritance))
}

/// Map CLI flags onto engine options.
pub fn normalize_options(args: &NormalizeArgs) -> NormalizeOptions {
    let presence_column = if args.no_presence_filter {
        None
    } else {
        Some(args.presence_column.clone())
    };
    let violation_policy = if args.drop_invalid_tables {
        ViolationPolicy::DropTable
    } else {
        ViolationPolicy::Abort
    };
    NormalizeOptions::new()
        .with_target(NormalForm::from(args.target))
        .with_inheritance(InheritanceMode::from(args.inheritance))
        .with_safe_dedupe(args.safe_dedupe)
        .with_violation_policy(violation_policy)
        .with_presence_column(presence_column)
        .with_carry_columns(args.carry_columns.iter().cloned())
}

fn load_registry(path: &Path, mode: InheritanceMode) -> Result<SchemaRegistry> {
    SchemaRegistry::from_path(path, mode)
        .with_context(|| format!("load schema {}", path.display()))
}

fn write_report(report: &NormalizationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))
}
