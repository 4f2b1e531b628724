//! Database normalization driver with ordered post-consolidation steps.
//!
//! Every raw table runs through the same sequence: schema check, 1NF, id
//! assignment and recursive splitting. Fragments are then consolidated into
//! one table per type and handed to a [`DatabasePipeline`].
//!
//! # Standard Step Order
//!
//! 1. **SafeDedupeStep** - Merge rows identical but for `id`, rewriting references
//! 2. **ClassTableStep** - Move child-type attributes into their own tables
//! 3. **EnumCheckStep** - Count values outside enum columns' allowed sets
//!
//! # Example
//!
//! ```ignore
//! use relnorm_core::{Normalizer, NormalizeOptions};
//!
//! let mut normalizer = Normalizer::new(&registry).with_options(NormalizeOptions::new());
//! let normalized = normalizer.run(&database)?;
//! ```

use polars::prelude::DataFrame;

use relnorm_model::{Database, FragmentDatabase, InheritanceMode, NormalizedDatabase, row_count};
use relnorm_schema::SchemaRegistry;

use crate::analyzer::validate_enums;
use crate::consolidate::{consolidate, safe_deduplicate, to_class_table};
use crate::error::Result;
use crate::ids::{IdGenerator, IdMapping, UuidGenerator};
use crate::options::{NormalizeOptions, ViolationPolicy};
use crate::report::{DroppedTable, NormalizationReport};
use crate::split::NormalizationPass;

/// Read-only inputs shared by every step.
pub struct StepContext<'a> {
    /// Flattened single-table registry the database was split with.
    pub registry: &'a SchemaRegistry,
    pub options: &'a NormalizeOptions,
}

/// A single rewrite of the consolidated database.
pub trait DatabaseStep: Send + Sync {
    fn execute(
        &self,
        database: &mut NormalizedDatabase,
        ctx: &StepContext<'_>,
        report: &mut NormalizationReport,
    ) -> Result<()>;

    /// Human-readable name for this step (for logging/debugging).
    fn step_name(&self) -> &str;

    /// Whether this step should be skipped for these options.
    ///
    /// Default implementation always runs the step.
    fn should_skip(&self, _ctx: &StepContext<'_>) -> bool {
        false
    }
}

/// An ordered pipeline of database steps.
pub struct DatabasePipeline {
    steps: Vec<Box<dyn DatabaseStep>>,
}

impl Default for DatabasePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabasePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: Box<dyn DatabaseStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn remove_step(mut self, step_name: &str) -> Self {
        self.steps.retain(|s| s.step_name() != step_name);
        self
    }

    /// Execute all steps in order, recording the ones that ran.
    pub fn execute(
        &self,
        database: &mut NormalizedDatabase,
        ctx: &StepContext<'_>,
        report: &mut NormalizationReport,
    ) -> Result<()> {
        for step in &self.steps {
            if step.should_skip(ctx) {
                continue;
            }
            step.execute(database, ctx, report)?;
            report.executed_steps.push(step.step_name().to_string());
        }
        Ok(())
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }
}

/// Build the pipeline with all standard steps.
pub fn build_default_pipeline() -> DatabasePipeline {
    DatabasePipeline::new()
        .add_step(Box::new(SafeDedupeStep))
        .add_step(Box::new(ClassTableStep))
        .add_step(Box::new(EnumCheckStep))
}

// ============================================================================
// Standard Steps
// ============================================================================

/// Step 1: Merge rows identical in everything but `id`.
pub struct SafeDedupeStep;

impl DatabaseStep for SafeDedupeStep {
    fn execute(
        &self,
        database: &mut NormalizedDatabase,
        ctx: &StepContext<'_>,
        report: &mut NormalizationReport,
    ) -> Result<()> {
        report.deduplicated = safe_deduplicate(database, ctx.registry)?;
        Ok(())
    }

    fn step_name(&self) -> &str {
        "safe_dedupe"
    }

    fn should_skip(&self, ctx: &StepContext<'_>) -> bool {
        !ctx.options.safe_dedupe
    }
}

/// Step 2: Convert to class-table inheritance.
pub struct ClassTableStep;

impl DatabaseStep for ClassTableStep {
    fn execute(
        &self,
        database: &mut NormalizedDatabase,
        ctx: &StepContext<'_>,
        _report: &mut NormalizationReport,
    ) -> Result<()> {
        *database = to_class_table(database, ctx.registry)?;
        Ok(())
    }

    fn step_name(&self) -> &str {
        "class_table"
    }

    fn should_skip(&self, ctx: &StepContext<'_>) -> bool {
        ctx.options.inheritance != InheritanceMode::ClassTable
    }
}

/// Step 3: Count enum violations. Diagnostic only, tables are unchanged.
pub struct EnumCheckStep;

impl DatabaseStep for EnumCheckStep {
    fn execute(
        &self,
        database: &mut NormalizedDatabase,
        ctx: &StepContext<'_>,
        report: &mut NormalizationReport,
    ) -> Result<()> {
        for (table_type, table) in database.iter() {
            let Some(schema) = ctx.registry.get(table_type) else {
                continue;
            };
            let violations = validate_enums(table, schema);
            if !violations.is_empty() {
                tracing::warn!(
                    table_type = %table_type,
                    count = violations.len(),
                    "values outside enum column domain"
                );
            }
            NormalizationReport::record_count(
                &mut report.enum_violations,
                table_type,
                violations.len(),
            );
        }
        Ok(())
    }

    fn step_name(&self) -> &str {
        "enum_check"
    }
}

/// Output of a normalization run.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub database: NormalizedDatabase,
    pub report: NormalizationReport,
}

impl Normalized {
    pub fn table(&self, table_type: &str) -> Option<&DataFrame> {
        self.database.get(table_type)
    }
}

/// Normalizes whole databases against one schema.
///
/// Holds the id mapping across runs, so chunked input normalized through
/// one `Normalizer` resolves the same raw ids to the same UUIDs.
pub struct Normalizer<'a> {
    registry: &'a SchemaRegistry,
    options: NormalizeOptions,
    generator: Box<dyn IdGenerator>,
    id_mapping: IdMapping,
    pipeline: DatabasePipeline,
}

impl<'a> Normalizer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            options: NormalizeOptions::default(),
            generator: Box::new(UuidGenerator),
            id_mapping: IdMapping::new(),
            pipeline: build_default_pipeline(),
        }
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_id_mapping(mut self, id_mapping: IdMapping) -> Self {
        self.id_mapping = id_mapping;
        self
    }

    pub fn with_pipeline(mut self, pipeline: DatabasePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn id_mapping(&self) -> &IdMapping {
        &self.id_mapping
    }

    pub fn into_id_mapping(self) -> IdMapping {
        self.id_mapping
    }

    /// Normalize every table of `database` to the configured target.
    ///
    /// Input types are processed in sorted order and tables within a type in
    /// input order, so identical embedded records share ids deterministically.
    pub fn run(&mut self, database: &Database) -> Result<Normalized> {
        // Splitting walks flattened descriptors; class-table form is produced afterwards.
        let registry = self.registry.with_mode(InheritanceMode::SingleTable)?;
        tracing::info!(
            types = database.len(),
            rows = row_count(database),
            target = %self.options.target,
            "normalizing database"
        );

        let mut fragments = FragmentDatabase::new();
        let mut pass = NormalizationPass::new(
            &registry,
            &self.options,
            &mut *self.generator,
            &mut self.id_mapping,
        );
        for (table_type, tables) in database {
            for (index, table) in tables.iter().enumerate() {
                match pass.normalize_table(table_type, table) {
                    Ok(produced) => {
                        for (produced_type, mut produced_tables) in produced {
                            fragments
                                .entry(produced_type)
                                .or_default()
                                .append(&mut produced_tables);
                        }
                    }
                    Err(error)
                        if self.options.violation_policy == ViolationPolicy::DropTable
                            && error.is_table_violation() =>
                    {
                        tracing::warn!(
                            table_type = %table_type,
                            index,
                            error = %error,
                            "dropping table that does not match the schema"
                        );
                        pass.report_mut().dropped_tables.push(DroppedTable {
                            table_type: table_type.clone(),
                            index,
                            reason: error.to_string(),
                        });
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        let mut report = pass.into_report();

        let mut normalized = consolidate(fragments)?;
        let ctx = StepContext {
            registry: &registry,
            options: &self.options,
        };
        self.pipeline.execute(&mut normalized, &ctx, &mut report)?;

        tracing::info!(
            types = normalized.len(),
            splits = report.splits.values().sum::<usize>(),
            reused_ids = report.reused_ids,
            excluded_rows = report.total_missing(),
            dropped_tables = report.dropped_tables.len(),
            "normalization complete"
        );
        Ok(Normalized {
            database: normalized,
            report,
        })
    }
}

/// Normalize `database` with fresh random ids and an empty id mapping.
pub fn normalize_database(
    database: &Database,
    registry: &SchemaRegistry,
    options: NormalizeOptions,
) -> Result<Normalized> {
    Normalizer::new(registry).with_options(options).run(database)
}
