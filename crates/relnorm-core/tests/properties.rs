//! Property tests for repeating-group elimination and id reuse.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use proptest::prelude::{Just, Strategy, prop, prop_assert, prop_assert_eq, prop_oneof, proptest};
use relnorm_core::frame::cell_text_by_name;
use relnorm_core::{NormalizeOptions, Normalizer, SequentialIdGenerator, to_first_normal_form};
use relnorm_model::{InheritanceMode, single_table_database};
use relnorm_schema::SchemaRegistry;

const SCHEMA: &str = r#"
Transaction:
  attributes: [id, amount, donor_id]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id, name]
"#;

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_yaml_str(SCHEMA, InheritanceMode::SingleTable).unwrap()
}

fn amount() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), Just(Some(0.0)), (1u32..500).prop_map(|v| Some(f64::from(v)))]
}

proptest! {
    #[test]
    fn first_normal_form_keeps_positive_slots_and_is_idempotent(
        rows in prop::collection::vec((amount(), amount()), 1..20)
    ) {
        let registry = registry();
        let schema = registry.resolve("Transaction").unwrap();
        let ids: Vec<String> = (0..rows.len()).map(|row| format!("t{row}")).collect();
        let first: Vec<Option<f64>> = rows.iter().map(|(a, _)| *a).collect();
        let second: Vec<Option<f64>> = rows.iter().map(|(_, b)| *b).collect();
        let table = df! {
            "id" => ids,
            "amount-1" => first,
            "amount-2" => second,
        }
        .unwrap();

        let once = to_first_normal_form(&table, schema, Some("amount")).unwrap();
        let expected = rows
            .iter()
            .flat_map(|(a, b)| [*a, *b])
            .filter(|value| value.is_some_and(|v| v > 0.0))
            .count();
        prop_assert_eq!(once.height(), expected);

        let twice = to_first_normal_form(&once, schema, Some("amount")).unwrap();
        prop_assert!(twice.equals_missing(&once));
    }

    #[test]
    fn identical_donors_share_exactly_one_id(
        names in prop::collection::vec(prop::sample::select(vec!["Acme", "Bolt", "Cyan"]), 1..16)
    ) {
        let registry = registry();
        let table = df! {
            "amount" => vec![1.0; names.len()],
            "donor--name" => names.clone(),
        }
        .unwrap();
        let normalized = Normalizer::new(&registry)
            .with_options(NormalizeOptions::default())
            .with_generator(SequentialIdGenerator::new())
            .run(&single_table_database([("Transaction", table)]))
            .unwrap();

        let transactions = normalized.table("Transaction").unwrap();
        let mut by_name: BTreeMap<&str, String> = BTreeMap::new();
        for (row, name) in names.iter().enumerate() {
            let key = cell_text_by_name(transactions, "donor_id", row).unwrap();
            let known = by_name.entry(*name).or_insert_with(|| key.clone());
            prop_assert_eq!(known.as_str(), key.as_str());
        }
        let distinct: BTreeSet<&String> = by_name.values().collect();
        prop_assert_eq!(distinct.len(), by_name.len());
        prop_assert_eq!(normalized.table("Transactor").unwrap().height(), by_name.len());
        prop_assert_eq!(normalized.report.reused_ids, names.len() - by_name.len());
    }
}
