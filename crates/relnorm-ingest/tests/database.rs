//! Loading and writing whole CSV databases.

use polars::prelude::*;
use relnorm_ingest::{IngestError, load_database, save_database};
use relnorm_model::NormalizedDatabase;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    std::fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn loads_each_csv_under_its_stem() {
    let dir = TempDir::new().unwrap();
    write(&dir, "Transaction.csv", "id,amount-1,donor--name\n1,50,Acme\n2,,Bolt\n");
    write(&dir, "Transactor.csv", "name\nCyan\n");
    write(&dir, "README.md", "not data");

    let database = load_database(dir.path()).unwrap();
    assert_eq!(
        database.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["Transaction", "Transactor"]
    );
    let transactions = &database["Transaction"][0];
    assert_eq!(transactions.height(), 2);
    assert_eq!(transactions.column("amount-1").unwrap().dtype(), &DataType::String);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_database(&dir.path().join("absent"));
    assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
}

#[test]
fn saves_one_file_per_type() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("normalized");
    let mut database = NormalizedDatabase::new();
    database.insert(
        "Transactor".to_string(),
        df! { "id" => ["a"], "name" => ["Acme"] }.unwrap(),
    );
    database.insert(
        "Address".to_string(),
        df! { "id" => ["b"], "city" => ["Chicago"], "transactor_id" => ["a"] }.unwrap(),
    );

    let written = save_database(&database, &output).unwrap();
    assert_eq!(written, vec![output.join("Address.csv"), output.join("Transactor.csv")]);

    let reloaded = load_database(&output).unwrap();
    assert!(reloaded["Transactor"][0].equals_missing(&database["Transactor"]));
    assert!(reloaded["Address"][0].equals_missing(&database["Address"]));
}

#[test]
fn suffixed_files_load_as_tables_of_one_type() {
    let dir = TempDir::new().unwrap();
    write(&dir, "Transaction.2020.csv", "amount,donor--name\n10,Acme\n");
    write(&dir, "Transaction.2021.csv", "amount,donor--name\n20,Bolt\n30,Cyan\n");
    write(&dir, "Transactor.csv", "name\nDune\n");

    let database = load_database(dir.path()).unwrap();
    assert_eq!(database.len(), 2);
    let heights: Vec<usize> = database["Transaction"].iter().map(DataFrame::height).collect();
    assert_eq!(heights, vec![1, 2]);
    assert_eq!(database["Transactor"].len(), 1);
}
