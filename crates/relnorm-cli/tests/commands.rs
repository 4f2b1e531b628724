//! End-to-end runs of the CLI commands over temporary folders.

use clap::Parser;
use relnorm_cli::cli::{Cli, Command};
use relnorm_cli::commands::{normalize_options, run_normalize, run_schema, run_status};
use relnorm_cli::summary::{schema_table, status_text, summary_table};
use relnorm_cli::types::StatusOutcome;
use relnorm_core::ViolationPolicy;
use relnorm_model::NormalForm;
use tempfile::TempDir;

const SCHEMA: &str = r#"
Transaction:
  attributes: [id, amount, donor_id]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id, name]
"#;

fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("schema.yaml"), SCHEMA).unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir(&input).unwrap();
    for (name, content) in files {
        std::fs::write(input.join(name), content).unwrap();
    }
    dir
}

fn parse(dir: &TempDir, command: &str, extra: &[&str]) -> Command {
    let input = dir.path().join("input");
    let schema = dir.path().join("schema.yaml");
    let mut argv = vec![
        "relnorm".to_string(),
        command.to_string(),
        input.display().to_string(),
        "--schema".to_string(),
        schema.display().to_string(),
    ];
    argv.extend(extra.iter().map(|arg| arg.to_string()));
    Cli::try_parse_from(argv).unwrap().command
}

const TRANSACTIONS: &str = "amount-1,amount-2,donor--name\n10,,Acme\n5,7,Acme\n";

#[test]
fn normalize_writes_one_file_per_type() {
    let dir = fixture(&[("Transaction.csv", TRANSACTIONS)]);
    let mapping = dir.path().join("ids.json");
    let report = dir.path().join("report.json");
    let mapping_arg = mapping.display().to_string();
    let report_arg = report.display().to_string();
    let Command::Normalize(args) = parse(
        &dir,
        "normalize",
        &["--id-mapping", &mapping_arg, "--report", &report_arg],
    ) else {
        panic!("expected normalize");
    };

    let result = run_normalize(&args).unwrap();
    let output = dir.path().join("input").join("normalized");
    assert_eq!(result.output_dir, output);
    assert_eq!(
        result.written,
        vec![output.join("Transaction.csv"), output.join("Transactor.csv")]
    );
    let rows: Vec<(&str, usize)> = result
        .tables
        .iter()
        .map(|table| (table.table_type.as_str(), table.rows))
        .collect();
    assert_eq!(rows, vec![("Transaction", 3), ("Transactor", 1)]);
    assert_eq!(result.report.reused_ids, 2);
    assert!(!result.has_dropped_tables());
    assert!(mapping.exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["input_rows"], 2);

    let rendered = summary_table(&result).to_string();
    assert!(rendered.contains("Transactor"));
    assert!(rendered.contains("TOTAL"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = fixture(&[("Transaction.csv", TRANSACTIONS)]);
    let output = dir.path().join("out");
    let output_arg = output.display().to_string();
    let Command::Normalize(args) =
        parse(&dir, "normalize", &["--output-dir", &output_arg, "--dry-run"])
    else {
        panic!("expected normalize");
    };

    let result = run_normalize(&args).unwrap();
    assert!(result.written.is_empty());
    assert_eq!(result.tables.len(), 2);
    assert!(!output.exists());
}

#[test]
fn invalid_tables_abort_unless_dropped() {
    let files = [
        ("Transaction.csv", TRANSACTIONS),
        ("Ledger.csv", "entry\n1\n"),
    ];
    let dir = fixture(&files);
    let Command::Normalize(args) = parse(&dir, "normalize", &["--dry-run"]) else {
        panic!("expected normalize");
    };
    assert!(run_normalize(&args).is_err());

    let Command::Normalize(args) =
        parse(&dir, "normalize", &["--dry-run", "--drop-invalid-tables"])
    else {
        panic!("expected normalize");
    };
    assert_eq!(
        normalize_options(&args).violation_policy,
        ViolationPolicy::DropTable
    );
    let result = run_normalize(&args).unwrap();
    assert!(result.has_dropped_tables());
    assert_eq!(result.report.dropped_tables[0].table_type, "Ledger");
}

#[test]
fn status_reports_levels_without_normalizing() {
    let dir = fixture(&[
        ("Transaction.csv", TRANSACTIONS),
        ("Bogus.csv", "x\n1\n"),
    ]);
    let Command::Status(args) = parse(&dir, "status", &[]) else {
        panic!("expected status");
    };

    let result = run_status(&args).unwrap();
    assert_eq!(result.target, NormalForm::FourthNormalForm);
    assert!(matches!(result.tables[0].outcome, StatusOutcome::Invalid(_)));
    let StatusOutcome::Classified(status) = &result.tables[1].outcome else {
        panic!("expected classified table");
    };
    assert_eq!(status.overall, NormalForm::Unnormalized);
    assert_eq!(status.prefixes_below(result.target), vec!["donor"]);

    insta::assert_snapshot!(status_text(&result).trim_end(), @r"
    Bogus: invalid (unknown entity type Bogus)
    Transaction: UNF
      UNF: amount-1, amount-2
      1NF: donor--name
    ");
}

#[test]
fn schema_lists_resolved_types() {
    let dir = fixture(&[]);
    let schema = dir.path().join("schema.yaml").display().to_string();
    let cli = Cli::try_parse_from(["relnorm", "schema", schema.as_str()]).unwrap();
    let Command::Schema(args) = cli.command else {
        panic!("expected schema");
    };

    let registry = run_schema(&args).unwrap();
    assert!(registry.contains("Transactor"));
    let rendered = schema_table(&registry).to_string();
    assert!(rendered.contains("donor -> Transactor"));
}
