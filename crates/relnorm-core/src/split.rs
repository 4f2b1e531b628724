//! Relation splitting.
//!
//! Each input table becomes a small arena of fragments. Splitting a
//! relation prefix off a fragment rewrites that fragment and appends the
//! derived fragment, whose own prefixes are queued in turn. A task is keyed
//! by `(fragment, prefix)` and consumed once, and every task removes its
//! prefix's columns, so the queue drains on any schema whose forward
//! relations are acyclic.
//!
//! Forward relations (`donor--name`) become a `donor_id` key into a
//! deduplicated table of the target type. Multivalued relations
//! (`address--city`) become rows of the target type carrying a
//! back-reference to the origin row.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use polars::prelude::{Column, DataFrame, PolarsResult};

use relnorm_model::{
    ColumnToken, FragmentDatabase, ID_COLUMN, ID_SUFFIX, SPLIT, relation_id_column,
    strip_relation_prefix,
};
use relnorm_schema::{EntityTypeSchema, SchemaRegistry};

use crate::analyzer::classify;
use crate::error::{NormalizationError, Result};
use crate::first_normal_form::to_first_normal_form;
use crate::frame::{
    cell_text, column_names, drop_columns, gather_rows, has_column, move_to_front, string_column,
};
use crate::ids::{IdGenerator, IdKey, IdMapping, assign_ids, is_uuid};
use crate::options::NormalizeOptions;
use crate::report::NormalizationReport;

/// Non-null `(attribute, value)` pairs of one would-be derived row, sorted by attribute.
type Record = Vec<(String, String)>;

/// Index of a fragment in a table's arena.
pub type FragmentId = usize;

/// One relation prefix of one fragment awaiting extraction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTask {
    pub fragment: FragmentId,
    pub prefix: String,
}

/// Result of extracting a single relation prefix.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Origin table without the prefix's columns.
    pub remaining: DataFrame,
    /// Derived type and its new rows, if any row embedded the relation.
    pub derived: Option<(String, DataFrame)>,
}

#[derive(Debug)]
struct Fragment {
    table_type: String,
    table: DataFrame,
}

/// Columns of a table that belong to one relation prefix.
struct RelationGroup {
    /// Origin columns under the prefix, without `{prefix}--id`.
    columns: Vec<String>,
    /// `columns` with the prefix stripped.
    attributes: Vec<String>,
    /// `{prefix}--id`, if the table embeds the related record's id.
    embedded_id: Option<String>,
    /// Carry columns present in the table and declared by the target type.
    carried: Vec<String>,
}

impl RelationGroup {
    fn collect(
        table: &DataFrame,
        prefix: &str,
        target: &EntityTypeSchema,
        carry_columns: &[String],
    ) -> Self {
        let mut columns = Vec::new();
        let mut attributes = Vec::new();
        let mut embedded_id = None;
        for name in column_names(table) {
            let Some(rest) = strip_relation_prefix(&name, prefix) else {
                continue;
            };
            if rest == ID_COLUMN {
                embedded_id = Some(name.clone());
            } else {
                attributes.push(rest.to_string());
                columns.push(name);
            }
        }
        let carried = carry_columns
            .iter()
            .filter(|carry| {
                has_column(table, carry)
                    && target.has_attribute(carry)
                    && !attributes.contains(carry)
            })
            .cloned()
            .collect();
        Self {
            columns,
            attributes,
            embedded_id,
            carried,
        }
    }

    /// Origin columns to remove once the group is extracted.
    fn origin_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .cloned()
            .chain(self.embedded_id.clone())
            .collect()
    }

    fn is_empty_at(&self, columns: &[&Column], row: usize) -> bool {
        columns.iter().all(|column| cell_text(column, row).is_none())
    }

    fn record_at(&self, columns: &[&Column], carried: &[&Column], row: usize) -> Record {
        let mut record: Record = self
            .attributes
            .iter()
            .zip(columns)
            .chain(self.carried.iter().zip(carried))
            .filter_map(|(name, column)| cell_text(column, row).map(|value| (name.clone(), value)))
            .collect();
        record.sort();
        record
    }

    /// Derived rows at `rows`, columns renamed to the target's attribute names.
    fn derived_table(&self, table: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
        let selection: Vec<String> = self.columns.iter().chain(&self.carried).cloned().collect();
        let mut derived = gather_rows(&table.select(selection)?, rows)?;
        if derived.width() == 0 {
            derived = DataFrame::empty_with_height(rows.len());
        }
        for (column, attribute) in self.columns.iter().zip(&self.attributes) {
            derived.rename(column, attribute.as_str().into())?;
        }
        Ok(derived)
    }
}

fn record_value<'r>(record: &'r Record, attribute: &str) -> Option<&'r str> {
    record
        .iter()
        .find(|(name, _)| name == attribute)
        .map(|(_, value)| value.as_str())
}

/// A row is verifiably incomplete when a required attribute of the target
/// cannot be filled. `id` is generated later and never checked; a required
/// `{relation}_id` is satisfied by any embedded `{relation}--...` value.
fn is_verifiably_incomplete(target: &EntityTypeSchema, record: &Record) -> bool {
    target.required_attributes().iter().any(|required| {
        if required == ID_COLUMN {
            return false;
        }
        if record_value(record, required).is_some() {
            return false;
        }
        match required.strip_suffix(ID_SUFFIX) {
            Some(relation) if target.forward_relations().contains_key(relation) => {
                let nested = format!("{relation}{SPLIT}");
                !record.iter().any(|(name, _)| name.starts_with(&nested))
            }
            _ => true,
        }
    })
}

/// State shared by every split of one `normalize_database` call.
///
/// Owns the record-to-id map that makes identical forward-relation records
/// share one id across all tables of the pass.
pub struct NormalizationPass<'a> {
    registry: &'a SchemaRegistry,
    options: &'a NormalizeOptions,
    generator: &'a mut dyn IdGenerator,
    mapping: &'a mut IdMapping,
    record_ids: BTreeMap<(String, Record), String>,
    keyed_records: BTreeMap<(String, String), Record>,
    report: NormalizationReport,
}

impl<'a> NormalizationPass<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        options: &'a NormalizeOptions,
        generator: &'a mut dyn IdGenerator,
        mapping: &'a mut IdMapping,
    ) -> Self {
        Self {
            registry,
            options,
            generator,
            mapping,
            record_ids: BTreeMap::new(),
            keyed_records: BTreeMap::new(),
            report: NormalizationReport::default(),
        }
    }

    pub fn report(&self) -> &NormalizationReport {
        &self.report
    }

    pub(crate) fn report_mut(&mut self) -> &mut NormalizationReport {
        &mut self.report
    }

    pub fn into_report(self) -> NormalizationReport {
        self.report
    }

    /// Validate, convert to 1NF, assign ids and split one raw input table.
    ///
    /// The remaining table is filed under the input type's storage type.
    /// Nothing is produced unless the whole table succeeds.
    pub fn normalize_table(
        &mut self,
        table_type: &str,
        table: &DataFrame,
    ) -> Result<FragmentDatabase> {
        let schema = self.resolve_input_type(table_type)?;
        classify(table, schema, self.registry)?;
        self.report.input_rows += table.height();

        let table = to_first_normal_form(table, schema, self.options.presence_column.as_deref())?;
        let table = assign_ids(&table, schema, self.mapping, self.generator)?;
        let (remaining, mut fragments) = self.split_table(table_type, table)?;
        // A child type's rows live in its hierarchy's table.
        fragments
            .entry(schema.storage_type().to_string())
            .or_default()
            .insert(0, remaining);
        Ok(fragments)
    }

    fn resolve_input_type(&self, table_type: &str) -> Result<&'a EntityTypeSchema> {
        self.registry
            .get(table_type)
            .ok_or_else(|| NormalizationError::UnknownTableType {
                table_type: table_type.to_string(),
            })
    }

    /// Split every relation prefix below the target level out of `table`,
    /// recursing into derived tables.
    ///
    /// `table` must already be in 1NF and carry ids.
    pub fn split_table(
        &mut self,
        table_type: &str,
        table: DataFrame,
    ) -> Result<(DataFrame, FragmentDatabase)> {
        let mut arena = vec![Fragment {
            table_type: table_type.to_string(),
            table,
        }];
        let mut queue: VecDeque<SplitTask> = self.plan(0, &arena[0])?.into();
        let mut consumed: BTreeSet<SplitTask> = BTreeSet::new();

        while let Some(task) = queue.pop_front() {
            if !consumed.insert(task.clone()) {
                continue;
            }
            let fragment = &arena[task.fragment];
            let outcome = self.split(&fragment.table_type, &fragment.table, &task.prefix)?;
            arena[task.fragment].table = outcome.remaining;

            if let Some((derived_type, derived)) = outcome.derived {
                let schema = self.registry.resolve(&derived_type)?;
                let derived = to_first_normal_form(&derived, schema, None)?;
                let id = arena.len();
                arena.push(Fragment {
                    table_type: derived_type,
                    table: derived,
                });
                queue.extend(self.plan(id, &arena[id])?);
            }
        }

        let mut fragments = arena.into_iter();
        let root = fragments.next().map(|fragment| fragment.table).unwrap_or_default();
        let mut derived = FragmentDatabase::new();
        for fragment in fragments.filter(|fragment| fragment.table.height() > 0) {
            derived
                .entry(fragment.table_type)
                .or_default()
                .push(fragment.table);
        }
        Ok((root, derived))
    }

    fn plan(&self, id: FragmentId, fragment: &Fragment) -> Result<Vec<SplitTask>> {
        let schema = self.registry.resolve(&fragment.table_type)?;
        let status = classify(&fragment.table, schema, self.registry)?;
        Ok(status
            .prefixes_below(self.options.target)
            .into_iter()
            .map(|prefix| SplitTask {
                fragment: id,
                prefix,
            })
            .collect())
    }

    /// Extract one relation prefix from `table`.
    pub fn split(
        &mut self,
        table_type: &str,
        table: &DataFrame,
        prefix: &str,
    ) -> Result<SplitOutcome> {
        let registry = self.registry;
        let schema = registry.resolve(table_type)?;
        let outcome = match schema.tokenize(prefix) {
            Some(ColumnToken::ForwardRelation { target, .. }) => {
                self.split_forward(table_type, table, prefix, &target)?
            }
            Some(ColumnToken::MultivaluedRelation { target, .. }) => {
                let back_reference = schema.back_references().get(prefix).cloned();
                self.split_multivalued(table_type, table, prefix, &target, back_reference)?
            }
            _ => SplitOutcome {
                remaining: table.clone(),
                derived: None,
            },
        };
        if let Some((derived_type, derived)) = &outcome.derived {
            self.report.record_split(derived_type);
            tracing::debug!(
                table_type,
                prefix,
                derived_type = %derived_type,
                rows = derived.height(),
                "split relation"
            );
        }
        Ok(outcome)
    }

    /// Id embedded as `{prefix}--id`, mapped to a UUID under the target type.
    fn embedded_id(
        &mut self,
        table: &DataFrame,
        column: Option<&Column>,
        target: &str,
        row: usize,
    ) -> Option<String> {
        let value = cell_text(column?, row)?;
        if is_uuid(&value) {
            return Some(value);
        }
        let key = IdKey::for_row(&value, target, table, row);
        Some(self.mapping.get_or_assign(key, self.generator))
    }

    /// Remember the record an existing key names. Returns whether the key is new.
    fn claim_key(
        &mut self,
        origin_type: &str,
        key_column: &str,
        target: &str,
        key: &str,
        record: &Record,
    ) -> Result<bool> {
        let slot = (target.to_string(), key.to_string());
        let Some(known) = self.keyed_records.get_mut(&slot) else {
            self.keyed_records.insert(slot, record.clone());
            return Ok(true);
        };
        for (attribute, value) in record {
            match record_value(known, attribute) {
                Some(existing) if existing != value => {
                    return Err(NormalizationError::ConflictingForeignKey {
                        origin_type: origin_type.to_string(),
                        column: key_column.to_string(),
                        table_type: target.to_string(),
                        id: key.to_string(),
                    });
                }
                Some(_) => {}
                None => known.push((attribute.clone(), value.clone())),
            }
        }
        known.sort();
        Ok(false)
    }

    fn split_forward(
        &mut self,
        origin_type: &str,
        table: &DataFrame,
        prefix: &str,
        target_type: &str,
    ) -> Result<SplitOutcome> {
        let registry = self.registry;
        let target = registry.resolve(target_type)?;
        let group = RelationGroup::collect(table, prefix, target, &self.options.carry_columns);
        let key_column = relation_id_column(prefix);
        let existing = table.column(&key_column).ok();
        let embedded = group
            .embedded_id
            .as_deref()
            .and_then(|name| table.column(name).ok());
        let columns = group
            .columns
            .iter()
            .map(|name| table.column(name))
            .collect::<PolarsResult<Vec<_>>>()?;
        let carried = group
            .carried
            .iter()
            .map(|name| table.column(name))
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut keys: Vec<Option<String>> = Vec::with_capacity(table.height());
        let mut emitted_rows: Vec<usize> = Vec::new();
        let mut emitted_ids: Vec<Option<String>> = Vec::new();
        let mut missing = 0;

        for row in 0..table.height() {
            let existing_key = match existing.and_then(|column| cell_text(column, row)) {
                Some(key) => Some(key),
                None => self.embedded_id(table, embedded, target_type, row),
            };
            if group.is_empty_at(&columns, row) {
                keys.push(existing_key);
                continue;
            }
            let record = group.record_at(&columns, &carried, row);

            if let Some(key) = existing_key {
                if self.claim_key(origin_type, &key_column, target_type, &key, &record)? {
                    emitted_rows.push(row);
                    emitted_ids.push(Some(key.clone()));
                }
                self.record_ids
                    .entry((target_type.to_string(), record))
                    .or_insert_with(|| key.clone());
                keys.push(Some(key));
                continue;
            }

            if is_verifiably_incomplete(target, &record) {
                missing += 1;
                keys.push(None);
                continue;
            }

            let slot = (target_type.to_string(), record);
            if let Some(id) = self.record_ids.get(&slot) {
                self.report.reused_ids += 1;
                keys.push(Some(id.clone()));
            } else {
                let id = self.generator.next_id();
                self.record_ids.insert(slot, id.clone());
                emitted_rows.push(row);
                emitted_ids.push(Some(id.clone()));
                keys.push(Some(id));
            }
        }

        self.report.record_missing(target_type, missing);
        if missing > 0 {
            tracing::debug!(
                table_type = origin_type,
                prefix,
                derived_type = target_type,
                rows = missing,
                "excluded rows missing required attributes"
            );
        }

        let mut remaining = drop_columns(table, &group.origin_columns())?;
        remaining.with_column(string_column(&key_column, keys))?;

        let derived = if emitted_rows.is_empty() {
            None
        } else {
            let mut derived = group.derived_table(table, &emitted_rows)?;
            derived.with_column(string_column(ID_COLUMN, emitted_ids))?;
            Some((target_type.to_string(), move_to_front(&derived, ID_COLUMN)?))
        };
        Ok(SplitOutcome { remaining, derived })
    }

    fn split_multivalued(
        &mut self,
        origin_type: &str,
        table: &DataFrame,
        prefix: &str,
        target_type: &str,
        back_reference: Option<String>,
    ) -> Result<SplitOutcome> {
        let registry = self.registry;
        let target = registry.resolve(target_type)?;
        let group = RelationGroup::collect(table, prefix, target, &self.options.carry_columns);
        let origin_ids = table
            .column(ID_COLUMN)
            .map_err(|_| NormalizationError::MissingIdColumn {
                table_type: origin_type.to_string(),
            })?;
        let embedded = group
            .embedded_id
            .as_deref()
            .and_then(|name| table.column(name).ok());
        let columns = group
            .columns
            .iter()
            .map(|name| table.column(name))
            .collect::<PolarsResult<Vec<_>>>()?;
        let carried = group
            .carried
            .iter()
            .map(|name| table.column(name))
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut seen: BTreeSet<(Option<String>, Record)> = BTreeSet::new();
        let mut emitted_rows: Vec<usize> = Vec::new();
        let mut emitted_ids: Vec<Option<String>> = Vec::new();
        let mut back_references: Vec<Option<String>> = Vec::new();
        let mut missing = 0;

        for row in 0..table.height() {
            if group.is_empty_at(&columns, row) {
                continue;
            }
            let origin_id = cell_text(origin_ids, row);
            let mut record = group.record_at(&columns, &carried, row);
            if let Some(back_reference) = &back_reference
                && record_value(&record, back_reference).is_none()
                && let Some(origin_id) = &origin_id
            {
                record.push((back_reference.clone(), origin_id.clone()));
                record.sort();
            }
            if is_verifiably_incomplete(target, &record) {
                missing += 1;
                continue;
            }
            let back_value = back_reference
                .as_deref()
                .and_then(|name| record_value(&record, name))
                .map(str::to_string);
            if !seen.insert((origin_id, record)) {
                continue;
            }
            let id = match self.embedded_id(table, embedded, target_type, row) {
                Some(id) => id,
                None => self.generator.next_id(),
            };
            emitted_rows.push(row);
            emitted_ids.push(Some(id));
            back_references.push(back_value);
        }

        self.report.record_missing(target_type, missing);
        let remaining = drop_columns(table, &group.origin_columns())?;
        let derived = if emitted_rows.is_empty() {
            None
        } else {
            let mut derived = group.derived_table(table, &emitted_rows)?;
            if let Some(back_reference) = &back_reference {
                derived.with_column(string_column(back_reference, back_references))?;
            }
            derived.with_column(string_column(ID_COLUMN, emitted_ids))?;
            Some((target_type.to_string(), move_to_front(&derived, ID_COLUMN)?))
        };
        Ok(SplitOutcome { remaining, derived })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use relnorm_model::{InheritanceMode, NormalForm};

    use crate::frame::cell_text_by_name;
    use crate::ids::SequentialIdGenerator;

    const SCHEMA: &str = r#"
Transaction:
  attributes: [id, amount, donor_id, reported_state]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id, name, state, reported_state]
  required_attributes: [id, name]
  reverse_relations: {address: Address}
  reverse_relation_names: {address: transactor_id}
Address:
  attributes: [id, city, transactor_id]
  required_attributes: [transactor_id]
"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_yaml_str(SCHEMA, InheritanceMode::SingleTable).unwrap()
    }

    fn texts(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        (0..df.height())
            .map(|row| cell_text_by_name(df, column, row))
            .collect()
    }

    #[test]
    fn forward_split_reuses_ids_for_identical_records() {
        let registry = registry();
        let options = NormalizeOptions::default();
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let table = df! {
            "id" => ["t1", "t2", "t3"],
            "donor--name" => [Some("Acme"), Some("Acme"), None],
            "donor--state" => [Some("IL"), Some("IL"), None],
        }
        .unwrap();

        let outcome = pass.split("Transaction", &table, "donor").unwrap();
        assert_eq!(column_names(&outcome.remaining), vec!["id", "donor_id"]);
        let keys = texts(&outcome.remaining, "donor_id");
        assert_eq!(keys[0], keys[1]);
        assert_eq!(keys[2], None);

        let (derived_type, derived) = outcome.derived.unwrap();
        assert_eq!(derived_type, "Transactor");
        assert_eq!(derived.height(), 1);
        assert_eq!(column_names(&derived), vec!["id", "name", "state"]);
        assert_eq!(texts(&derived, "id")[0], keys[0]);
        assert_eq!(pass.report().reused_ids, 1);
    }

    #[test]
    fn existing_key_wins() {
        let registry = registry();
        let options = NormalizeOptions::default();
        let mut generator = SequentialIdGenerator::starting_at(100);
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let known = "8f0b2d1e-4c6a-4b7e-9a3f-2d5c7e9b1a40";
        let table = df! {
            "id" => ["t1", "t2"],
            "donor_id" => [Some(known), None],
            "donor--name" => [Some("Acme"), Some("Acme")],
        }
        .unwrap();
        let outcome = pass.split("Transaction", &table, "donor").unwrap();
        assert_eq!(
            texts(&outcome.remaining, "donor_id"),
            vec![Some(known.to_string()), Some(known.to_string())]
        );
        let (_, derived) = outcome.derived.unwrap();
        assert_eq!(texts(&derived, "id"), vec![Some(known.to_string())]);
    }

    #[test]
    fn conflicting_records_under_one_key_fail() {
        let registry = registry();
        let options = NormalizeOptions::default();
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let known = "8f0b2d1e-4c6a-4b7e-9a3f-2d5c7e9b1a40";
        let table = df! {
            "id" => ["t1", "t2"],
            "donor_id" => [known, known],
            "donor--name" => ["Acme", "Bolt"],
        }
        .unwrap();
        let error = pass.split("Transaction", &table, "donor").unwrap_err();
        assert!(matches!(error, NormalizationError::ConflictingForeignKey { .. }));
    }

    #[test]
    fn incomplete_records_are_counted_not_split() {
        let registry = registry();
        let options = NormalizeOptions::default();
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let table = df! {
            "id" => ["t1"],
            "donor--state" => ["IL"],
        }
        .unwrap();
        let outcome = pass.split("Transaction", &table, "donor").unwrap();
        assert!(outcome.derived.is_none());
        assert_eq!(texts(&outcome.remaining, "donor_id"), vec![None]);
        assert_eq!(pass.report().required_attribute_missing["Transactor"], 1);
    }

    #[test]
    fn multivalued_split_adds_back_reference() {
        let registry = registry();
        let options = NormalizeOptions::default();
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let table = df! {
            "id" => ["p1", "p2", "p3"],
            "name" => ["Ada", "Ben", "Cy"],
            "address--city" => [Some("Chicago"), Some("Chicago"), None],
        }
        .unwrap();
        let outcome = pass.split("Transactor", &table, "address").unwrap();
        assert_eq!(column_names(&outcome.remaining), vec!["id", "name"]);
        let (derived_type, derived) = outcome.derived.unwrap();
        assert_eq!(derived_type, "Address");
        assert_eq!(column_names(&derived), vec!["id", "city", "transactor_id"]);
        assert_eq!(
            texts(&derived, "transactor_id"),
            vec![Some("p1".to_string()), Some("p2".to_string())]
        );
        assert_ne!(texts(&derived, "id")[0], texts(&derived, "id")[1]);
    }

    #[test]
    fn split_table_recurses_into_derived_tables() {
        let registry = registry();
        let options = NormalizeOptions::default().with_carry_columns(["reported_state"]);
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let table = df! {
            "id" => ["t1"],
            "reported_state" => ["IL"],
            "donor--name" => ["Acme"],
            "donor--address--city" => ["Chicago"],
        }
        .unwrap();
        let (remaining, derived) = pass.split_table("Transaction", table).unwrap();
        assert_eq!(
            column_names(&remaining),
            vec!["id", "reported_state", "donor_id"]
        );
        let donors = &derived["Transactor"][0];
        assert_eq!(column_names(donors), vec!["id", "name", "reported_state"]);
        let addresses = &derived["Address"][0];
        assert_eq!(texts(addresses, "transactor_id"), texts(donors, "id"));
        assert_eq!(texts(addresses, "city"), vec![Some("Chicago".to_string())]);
    }

    #[test]
    fn lower_target_keeps_multivalued_groups() {
        let registry = registry();
        let options = NormalizeOptions::default().with_target(NormalForm::ThirdNormalForm);
        let mut generator = SequentialIdGenerator::new();
        let mut mapping = IdMapping::new();
        let mut pass = NormalizationPass::new(&registry, &options, &mut generator, &mut mapping);
        let table = df! {
            "id" => ["p1"],
            "name" => ["Ada"],
            "address--city" => ["Chicago"],
        }
        .unwrap();
        let (remaining, derived) = pass.split_table("Transactor", table).unwrap();
        assert!(derived.is_empty());
        assert_eq!(column_names(&remaining), vec!["id", "name", "address--city"]);
    }

    #[test]
    fn verifiably_incomplete_accepts_embedded_forward_columns() {
        let registry = SchemaRegistry::from_yaml_str(
            r#"
Membership:
  attributes: [id, member_id, role]
  required_attributes: [member_id]
  forward_relations: {member: Person}
Person:
  attributes: [id, name]
"#,
            InheritanceMode::SingleTable,
        )
        .unwrap();
        let membership = registry.resolve("Membership").unwrap();
        let nested = vec![("member--name".to_string(), "Ada".to_string())];
        assert!(!is_verifiably_incomplete(membership, &nested));
        let keyed = vec![("member_id".to_string(), "x".to_string())];
        assert!(!is_verifiably_incomplete(membership, &keyed));
        let bare = vec![("role".to_string(), "chair".to_string())];
        assert!(is_verifiably_incomplete(membership, &bare));
    }
}
