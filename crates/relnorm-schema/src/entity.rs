//! Resolved, immutable per-type schema.

use std::collections::{BTreeMap, BTreeSet};

use relnorm_model::{
    ColumnToken, ID_COLUMN, InheritanceMode, Result, relation_id_column, split_repeating,
};

use crate::matcher::{CompiledMatchers, TokenMatcher};

/// Descriptors of one entity type after inheritance resolution.
///
/// Built once by [`crate::resolve::resolve_entity`]; nothing mutates it
/// afterwards.
#[derive(Debug, Clone)]
pub struct EntityTypeSchema {
    name: String,
    mode: InheritanceMode,
    storage_type: String,
    attributes: BTreeSet<String>,
    forward_relations: BTreeMap<String, String>,
    multivalued_columns: BTreeMap<String, String>,
    back_references: BTreeMap<String, String>,
    repeating_columns: BTreeSet<String>,
    required_attributes: BTreeSet<String>,
    enum_columns: BTreeMap<String, BTreeSet<String>>,
    parent_type: Option<String>,
    child_types: Vec<String>,
    matchers: CompiledMatchers,
}

/// Plain descriptor sets gathered by the resolver before compilation.
#[derive(Debug, Default)]
pub(crate) struct Descriptors {
    pub attributes: BTreeSet<String>,
    pub forward_relations: BTreeMap<String, String>,
    pub multivalued_columns: BTreeMap<String, String>,
    pub back_references: BTreeMap<String, String>,
    pub repeating_columns: BTreeSet<String>,
    pub required_attributes: BTreeSet<String>,
    pub enum_columns: BTreeMap<String, BTreeSet<String>>,
}

impl EntityTypeSchema {
    pub(crate) fn compile(
        name: &str,
        mode: InheritanceMode,
        descriptors: Descriptors,
        parent_type: Option<String>,
        child_types: Vec<String>,
    ) -> Result<Self> {
        let matchers = CompiledMatchers {
            attributes: TokenMatcher::exact(
                name,
                descriptors.attributes.iter().map(String::as_str),
            )?,
            repeating_columns: TokenMatcher::repeating(
                name,
                descriptors.repeating_columns.iter().map(String::as_str),
            )?,
            forward_relations: TokenMatcher::exact(
                name,
                descriptors.forward_relations.keys().map(String::as_str),
            )?,
            multivalued_columns: TokenMatcher::exact(
                name,
                descriptors.multivalued_columns.keys().map(String::as_str),
            )?,
        };
        Ok(Self {
            name: name.to_string(),
            mode,
            storage_type: name.to_string(),
            attributes: descriptors.attributes,
            forward_relations: descriptors.forward_relations,
            multivalued_columns: descriptors.multivalued_columns,
            back_references: descriptors.back_references,
            repeating_columns: descriptors.repeating_columns,
            required_attributes: descriptors.required_attributes,
            enum_columns: descriptors.enum_columns,
            parent_type,
            child_types,
            matchers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> InheritanceMode {
        self.mode
    }

    /// Type whose table holds this type's rows: the hierarchy root under
    /// single-table inheritance, the type itself otherwise.
    ///
    /// Raw ids are scoped to this type, so a `Teacher` id and a
    /// `teacher_id` pointing at the root `Person` resolve alike.
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    pub(crate) fn with_storage_type(mut self, storage_type: &str) -> Self {
        self.storage_type = storage_type.to_string();
        self
    }

    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    pub fn forward_relations(&self) -> &BTreeMap<String, String> {
        &self.forward_relations
    }

    pub fn multivalued_columns(&self) -> &BTreeMap<String, String> {
        &self.multivalued_columns
    }

    /// Multivalued column to the attribute of its target naming this type.
    pub fn back_references(&self) -> &BTreeMap<String, String> {
        &self.back_references
    }

    pub fn repeating_columns(&self) -> &BTreeSet<String> {
        &self.repeating_columns
    }

    pub fn required_attributes(&self) -> &BTreeSet<String> {
        &self.required_attributes
    }

    pub fn enum_columns(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.enum_columns
    }

    pub fn parent_type(&self) -> Option<&str> {
        self.parent_type.as_deref()
    }

    pub fn child_types(&self) -> &[String] {
        &self.child_types
    }

    pub fn attributes_regex(&self) -> &TokenMatcher {
        &self.matchers.attributes
    }

    pub fn repeating_columns_regex(&self) -> &TokenMatcher {
        &self.matchers.repeating_columns
    }

    pub fn forward_relations_regex(&self) -> &TokenMatcher {
        &self.matchers.forward_relations
    }

    pub fn multivalued_columns_regex(&self) -> &TokenMatcher {
        &self.matchers.multivalued_columns
    }

    pub fn has_attribute(&self, column: &str) -> bool {
        column == ID_COLUMN || self.attributes.contains(column)
    }

    /// Target type of a forward or multivalued relation token.
    pub fn relation_target(&self, relation: &str) -> Option<&str> {
        self.forward_relations
            .get(relation)
            .or_else(|| self.multivalued_columns.get(relation))
            .map(String::as_str)
    }

    /// Foreign-key column for a forward relation, or `None` for other tokens.
    pub fn forward_key_column(&self, relation: &str) -> Option<String> {
        self.forward_relations
            .contains_key(relation)
            .then(|| relation_id_column(relation))
    }

    /// Resolve a single token against this type.
    ///
    /// `id` is always an attribute: every normalized table carries it.
    pub fn tokenize(&self, token: &str) -> Option<ColumnToken> {
        if token == ID_COLUMN || self.matchers.attributes.is_match(token) {
            return Some(ColumnToken::Attribute(token.to_string()));
        }
        if let Some(target) = self.forward_relations.get(token) {
            return Some(ColumnToken::ForwardRelation {
                name: token.to_string(),
                target: target.clone(),
            });
        }
        if let Some(target) = self.multivalued_columns.get(token) {
            return Some(ColumnToken::MultivaluedRelation {
                name: token.to_string(),
                target: target.clone(),
            });
        }
        if self.matchers.repeating_columns.is_match(token) {
            let (base, instance) = split_repeating(token)?;
            return Some(ColumnToken::RepeatingGroup {
                base: base.to_string(),
                instance,
            });
        }
        None
    }

    /// Whether a value is allowed in an enum column. Non-enum columns accept anything.
    pub fn allows_value(&self, column: &str, value: &str) -> bool {
        self.enum_columns
            .get(column)
            .is_none_or(|allowed| allowed.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction() -> EntityTypeSchema {
        let descriptors = Descriptors {
            attributes: ["id", "amount", "donor_id"].map(String::from).into(),
            forward_relations: [("donor".to_string(), "Transactor".to_string())].into(),
            repeating_columns: ["amount".to_string()].into(),
            ..Descriptors::default()
        };
        EntityTypeSchema::compile(
            "Transaction",
            InheritanceMode::SingleTable,
            descriptors,
            None,
            Vec::new(),
        )
        .expect("compile")
    }

    #[test]
    fn tokenizes_every_category() {
        let schema = transaction();
        assert_eq!(
            schema.tokenize("amount"),
            Some(ColumnToken::Attribute("amount".to_string()))
        );
        assert_eq!(
            schema.tokenize("amount-2"),
            Some(ColumnToken::RepeatingGroup {
                base: "amount".to_string(),
                instance: 2
            })
        );
        assert_eq!(
            schema.tokenize("donor"),
            Some(ColumnToken::ForwardRelation {
                name: "donor".to_string(),
                target: "Transactor".to_string()
            })
        );
        assert_eq!(schema.tokenize("recipient"), None);
    }

    #[test]
    fn empty_categories_match_nothing() {
        let schema = transaction();
        assert!(!schema.multivalued_columns_regex().is_match(""));
        assert!(!schema.multivalued_columns_regex().is_match("address"));
    }

    #[test]
    fn id_is_implicit_attribute() {
        let descriptors = Descriptors {
            attributes: ["name".to_string()].into(),
            ..Descriptors::default()
        };
        let schema = EntityTypeSchema::compile(
            "Tag",
            InheritanceMode::ClassTable,
            descriptors,
            None,
            Vec::new(),
        )
        .expect("compile");
        assert!(schema.has_attribute("id"));
        assert_eq!(schema.tokenize("id"), Some(ColumnToken::Attribute("id".to_string())));
    }

    #[test]
    fn forward_key_column_only_for_forward_relations() {
        let schema = transaction();
        assert_eq!(schema.forward_key_column("donor").as_deref(), Some("donor_id"));
        assert_eq!(schema.forward_key_column("amount"), None);
    }
}
