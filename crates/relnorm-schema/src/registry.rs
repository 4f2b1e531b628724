//! Loaded, validated and resolved schema.

use std::collections::BTreeMap;
use std::path::Path;

use relnorm_model::{FragmentDatabase, InheritanceMode, Result, SchemaError, relation_id_column};

use crate::document::SchemaDocument;
use crate::entity::EntityTypeSchema;
use crate::resolve::resolve_entity;
use crate::validate::validate_document;

/// A column of some table that stores ids of another type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    /// Type whose table holds the column.
    pub table_type: String,
    pub column: String,
}

/// Every entity type of a document, resolved for one inheritance mode.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    document: SchemaDocument,
    mode: InheritanceMode,
    types: BTreeMap<String, EntityTypeSchema>,
}

impl SchemaRegistry {
    /// Validate a document and resolve every type it declares.
    pub fn load(document: SchemaDocument, mode: InheritanceMode) -> Result<Self> {
        validate_document(&document)?;
        let types = document
            .type_names()
            .map(|name| Ok((name.to_string(), resolve_entity(&document, name, mode)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        tracing::debug!(types = types.len(), mode = %mode, "loaded schema");
        Ok(Self {
            document,
            mode,
            types,
        })
    }

    pub fn from_path(path: &Path, mode: InheritanceMode) -> Result<Self> {
        Self::load(SchemaDocument::from_path(path)?, mode)
    }

    pub fn from_yaml_str(source: &str, mode: InheritanceMode) -> Result<Self> {
        Self::load(SchemaDocument::from_yaml_str(source)?, mode)
    }

    /// Re-resolve the same document under another inheritance mode.
    pub fn with_mode(&self, mode: InheritanceMode) -> Result<Self> {
        if mode == self.mode {
            return Ok(self.clone());
        }
        Self::load(self.document.clone(), mode)
    }

    /// Resolved schema of a type.
    pub fn resolve(&self, name: &str) -> Result<&EntityTypeSchema> {
        self.types.get(name).ok_or_else(|| SchemaError::UnknownType {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&EntityTypeSchema> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &EntityTypeSchema> {
        self.types.values()
    }

    pub fn mode(&self) -> InheritanceMode {
        self.mode
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    /// An empty fragment list for every declared type.
    pub fn empty_fragments(&self) -> FragmentDatabase {
        self.types
            .keys()
            .map(|name| (name.clone(), Vec::new()))
            .collect()
    }

    /// Columns anywhere in the database that hold ids of `target`.
    ///
    /// Forward relations store `{relation}_id` on the origin type;
    /// multivalued relations store the back-reference on the target type.
    pub fn references_to(&self, target: &str) -> Vec<Reference> {
        let mut references = Vec::new();
        for schema in self.types.values() {
            for (relation, relation_target) in schema.forward_relations() {
                if relation_target == target {
                    references.push(Reference {
                        table_type: schema.name().to_string(),
                        column: relation_id_column(relation),
                    });
                }
            }
            if schema.name() == target {
                for (relation, relation_target) in schema.multivalued_columns() {
                    if let Some(back_reference) = schema.back_references().get(relation) {
                        references.push(Reference {
                            table_type: relation_target.clone(),
                            column: back_reference.clone(),
                        });
                    }
                }
            }
        }
        references.sort();
        references.dedup();
        references
    }
}
