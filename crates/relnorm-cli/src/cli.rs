//! CLI argument definitions for the `relnorm` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use relnorm_model::{InheritanceMode, NormalForm};

#[derive(Parser)]
#[command(
    name = "relnorm",
    version,
    about = "Normalize denormalized tables against an entity schema",
    long_about = "Normalize denormalized tables against an entity schema.\n\n\
                  Input tables use compound column names (donor--name, amount-2,\n\
                  address--city) that the schema resolves into entity types.\n\
                  Output is one CSV table per entity type in 4NF or the chosen target."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize a folder of CSV tables and write one table per entity type.
    Normalize(NormalizeArgs),

    /// Report the normal form of every input table without changing it.
    Status(StatusArgs),

    /// Print the resolved entity types of a schema document.
    Schema(SchemaArgs),
}

#[derive(Parser)]
pub struct NormalizeArgs {
    /// Folder of CSV files; each file stem names the table's entity type.
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Schema document (YAML or JSON).
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: PathBuf,

    /// Output directory for normalized tables (default: <INPUT_DIR>/normalized).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Lowest normal form every output table must reach.
    #[arg(long = "target", value_enum, default_value = "4nf")]
    pub target: TargetArg,

    /// How parent and child entity types share tables.
    #[arg(long = "inheritance", value_enum, default_value = "single")]
    pub inheritance: InheritanceArg,

    /// Merge rows identical in everything but `id`, rewriting references.
    #[arg(long = "safe-dedupe")]
    pub safe_dedupe: bool,

    /// Skip tables whose columns do not resolve instead of failing.
    #[arg(long = "drop-invalid-tables")]
    pub drop_invalid_tables: bool,

    /// JSON file mapping raw ids to UUIDs; read before and written after the run.
    #[arg(long = "id-mapping", value_name = "FILE")]
    pub id_mapping: Option<PathBuf>,

    /// Column whose empty or non-positive value drops a repeating slot.
    #[arg(
        long = "presence-column",
        value_name = "COL",
        default_value = "amount",
        conflicts_with = "no_presence_filter"
    )]
    pub presence_column: String,

    /// Keep every repeating slot that has any value.
    #[arg(long = "no-presence-filter")]
    pub no_presence_filter: bool,

    /// Column copied from an origin row into rows split off it (repeatable).
    #[arg(long = "carry-column", value_name = "COL")]
    pub carry_columns: Vec<String>,

    /// Write the run report as JSON.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Normalize and summarize without writing tables.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Folder of CSV files; each file stem names the table's entity type.
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Schema document (YAML or JSON).
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: PathBuf,

    /// Level below which relation prefixes are listed.
    #[arg(long = "target", value_enum, default_value = "4nf")]
    pub target: TargetArg,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Schema document (YAML or JSON).
    #[arg(value_name = "FILE")]
    pub schema: PathBuf,

    /// Resolve descriptors for this inheritance mode.
    #[arg(long = "inheritance", value_enum, default_value = "single")]
    pub inheritance: InheritanceArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TargetArg {
    #[value(name = "1nf")]
    First,
    #[value(name = "3nf")]
    Third,
    #[value(name = "4nf")]
    Fourth,
}

impl From<TargetArg> for NormalForm {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::First => NormalForm::FirstNormalForm,
            TargetArg::Third => NormalForm::ThirdNormalForm,
            TargetArg::Fourth => NormalForm::FourthNormalForm,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InheritanceArg {
    Single,
    Class,
}

impl From<InheritanceArg> for InheritanceMode {
    fn from(value: InheritanceArg) -> Self {
        match value {
            InheritanceArg::Single => InheritanceMode::SingleTable,
            InheritanceArg::Class => InheritanceMode::ClassTable,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
