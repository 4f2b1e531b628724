//! Normalization status analysis.
//!
//! Classification is diagnostic: it never touches the table. The splitter
//! uses the per-prefix levels to decide which relation groups to extract.

use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::DataFrame;

use relnorm_model::{
    ColumnToken, NormalForm, SchemaViolationError, ViolationReason, first_token, tokens,
};
use relnorm_schema::{EntityTypeSchema, SchemaRegistry};

use crate::frame::{cell_text, column_names};

/// Columns grouped by the lowest normal form they violate.
pub type LevelBuckets = BTreeMap<NormalForm, Vec<String>>;

/// Classification of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationStatus {
    pub table_type: String,
    /// Level of every column.
    pub columns: BTreeMap<String, NormalForm>,
    /// Level of every relation prefix: the minimum over its columns.
    pub prefixes: BTreeMap<String, NormalForm>,
    /// Minimum over all columns. A table without columns is fully normalized.
    pub overall: NormalForm,
}

impl NormalizationStatus {
    pub fn buckets(&self) -> LevelBuckets {
        let mut buckets = LevelBuckets::new();
        for (column, level) in &self.columns {
            buckets.entry(*level).or_default().push(column.clone());
        }
        buckets
    }

    /// Relation prefixes whose level is below `target`, in name order.
    pub fn prefixes_below(&self, target: NormalForm) -> Vec<String> {
        self.prefixes
            .iter()
            .filter(|(_, level)| **level < target)
            .map(|(prefix, _)| prefix.clone())
            .collect()
    }

    pub fn is_at_least(&self, target: NormalForm) -> bool {
        self.overall >= target
    }
}

impl fmt::Display for NormalizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.table_type, self.overall)?;
        for (level, columns) in self.buckets() {
            writeln!(f, "  {level}: {}", columns.join(", "))?;
        }
        Ok(())
    }
}

/// Classify every column of `table` against `schema`.
pub fn classify(
    table: &DataFrame,
    schema: &EntityTypeSchema,
    registry: &SchemaRegistry,
) -> Result<NormalizationStatus, SchemaViolationError> {
    classify_columns(column_names(table).iter().map(String::as_str), schema, registry)
}

/// Classify a set of column names without a table.
pub fn classify_columns<'a, I>(
    columns: I,
    schema: &EntityTypeSchema,
    registry: &SchemaRegistry,
) -> Result<NormalizationStatus, SchemaViolationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut status = NormalizationStatus {
        table_type: schema.name().to_string(),
        columns: BTreeMap::new(),
        prefixes: BTreeMap::new(),
        overall: NormalForm::FourthNormalForm,
    };
    for column in columns {
        let (level, is_relation) = column_level(column, schema, registry)?;
        status.columns.insert(column.to_string(), level);
        if is_relation {
            let prefix = status
                .prefixes
                .entry(first_token(column).to_string())
                .or_insert(level);
            *prefix = (*prefix).min(level);
        }
        status.overall = status.overall.min(level);
    }
    Ok(status)
}

/// Level of a single column path and whether it starts with a relation token.
///
/// Each token resolves against the type reached so far; the path must end
/// on an attribute or repeating-group token.
pub fn column_level(
    column: &str,
    schema: &EntityTypeSchema,
    registry: &SchemaRegistry,
) -> Result<(NormalForm, bool), SchemaViolationError> {
    let parts: Vec<&str> = tokens(column).collect();
    let mut current = schema;
    let mut level = NormalForm::FourthNormalForm;
    let mut is_relation = false;

    for (position, token) in parts.iter().enumerate() {
        let last = position + 1 == parts.len();
        let violation = |current: &EntityTypeSchema, reason| SchemaViolationError {
            table_type: current.name().to_string(),
            column: column.to_string(),
            token: (*token).to_string(),
            reason,
        };
        let Some(resolved) = current.tokenize(token) else {
            return Err(violation(current, ViolationReason::UnknownToken));
        };
        level = level.min(resolved.normal_form());
        match &resolved {
            ColumnToken::Attribute(_) | ColumnToken::RepeatingGroup { .. } => {
                if !last {
                    return Err(violation(current, ViolationReason::AttributeNotTerminal));
                }
            }
            ColumnToken::ForwardRelation { target, .. }
            | ColumnToken::MultivaluedRelation { target, .. } => {
                if last {
                    return Err(violation(current, ViolationReason::IncompleteRelationPath));
                }
                if position == 0 {
                    is_relation = true;
                }
                current = registry
                    .get(target)
                    .ok_or_else(|| violation(current, ViolationReason::UnknownToken))?;
            }
        }
    }
    Ok((level, is_relation))
}

/// A value outside its enum column's allowed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumViolation {
    pub column: String,
    pub row: usize,
    pub value: String,
}

/// Report every enum value not allowed by `schema`. Nulls are allowed.
pub fn validate_enums(table: &DataFrame, schema: &EntityTypeSchema) -> Vec<EnumViolation> {
    let mut violations = Vec::new();
    for column_name in schema.enum_columns().keys() {
        let Ok(column) = table.column(column_name) else {
            continue;
        };
        for row in 0..table.height() {
            if let Some(value) = cell_text(column, row)
                && !schema.allows_value(column_name, &value)
            {
                violations.push(EnumViolation {
                    column: column_name.clone(),
                    row,
                    value,
                });
            }
        }
    }
    if !violations.is_empty() {
        tracing::debug!(
            table_type = schema.name(),
            count = violations.len(),
            "enum values outside their allowed sets"
        );
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use relnorm_model::InheritanceMode;

    const SCHEMA: &str = r#"
Transaction:
  attributes: [id, amount, donor_id]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id, name, state, kind]
  enum_columns: {kind: [Individual, Organization]}
  reverse_relations: {address: Address}
  reverse_relation_names: {address: transactor_id}
Address:
  attributes: [id, city, transactor_id]
"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_yaml_str(SCHEMA, InheritanceMode::SingleTable).unwrap()
    }

    #[test]
    fn classifies_each_token_kind() {
        let registry = registry();
        let schema = registry.resolve("Transaction").unwrap();
        let status = classify_columns(
            [
                "id",
                "amount-1",
                "donor--name",
                "donor--address--city",
            ],
            schema,
            &registry,
        )
        .unwrap();
        assert_eq!(status.columns["id"], NormalForm::FourthNormalForm);
        assert_eq!(status.columns["amount-1"], NormalForm::Unnormalized);
        assert_eq!(status.columns["donor--name"], NormalForm::FirstNormalForm);
        assert_eq!(status.columns["donor--address--city"], NormalForm::FirstNormalForm);
        assert_eq!(status.prefixes["donor"], NormalForm::FirstNormalForm);
        assert_eq!(status.overall, NormalForm::Unnormalized);
    }

    #[test]
    fn nested_multivalued_level() {
        let registry = registry();
        let schema = registry.resolve("Transactor").unwrap();
        let status = classify_columns(["id", "address--city"], schema, &registry).unwrap();
        assert_eq!(status.overall, NormalForm::ThirdNormalForm);
        assert_eq!(status.prefixes_below(NormalForm::FourthNormalForm), vec!["address"]);
        assert!(status.prefixes_below(NormalForm::ThirdNormalForm).is_empty());
    }

    #[test]
    fn unknown_token_names_type_and_column() {
        let registry = registry();
        let schema = registry.resolve("Transaction").unwrap();
        let error = classify_columns(["donor--shoe_size"], schema, &registry).unwrap_err();
        assert_eq!(error.table_type, "Transactor");
        assert_eq!(error.column, "donor--shoe_size");
        assert_eq!(error.token, "shoe_size");
        assert_eq!(error.reason, ViolationReason::UnknownToken);
    }

    #[test]
    fn attribute_must_be_terminal() {
        let registry = registry();
        let schema = registry.resolve("Transaction").unwrap();
        let error = classify_columns(["amount--name"], schema, &registry).unwrap_err();
        assert_eq!(error.reason, ViolationReason::AttributeNotTerminal);
        let error = classify_columns(["donor"], schema, &registry).unwrap_err();
        assert_eq!(error.reason, ViolationReason::IncompleteRelationPath);
    }

    #[test]
    fn status_display_snapshot() {
        let registry = registry();
        let schema = registry.resolve("Transaction").unwrap();
        let table = df! {
            "id" => ["t1"],
            "amount" => [Some(10.0)],
            "amount-1" => [Some(50.0)],
            "donor--name" => ["Acme"],
            "donor--state" => ["IL"],
        }
        .unwrap();
        let status = classify(&table, schema, &registry).unwrap();
        insta::assert_snapshot!(status.to_string(), @r"
        Transaction: UNF
          UNF: amount-1
          1NF: donor--name, donor--state
          4NF: amount, id
        ");
    }

    #[test]
    fn reports_enum_violations() {
        let registry = registry();
        let schema = registry.resolve("Transactor").unwrap();
        let table = df! {
            "kind" => [Some("Individual"), Some("Committee"), None],
        }
        .unwrap();
        let violations = validate_enums(&table, schema);
        assert_eq!(
            violations,
            vec![EnumViolation {
                column: "kind".to_string(),
                row: 1,
                value: "Committee".to_string()
            }]
        );
    }
}
