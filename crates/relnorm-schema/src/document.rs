//! Raw schema document as written by the user.
//!
//! The document is a top-level mapping of entity type name to its
//! declaration. Nothing here is resolved: inheritance, redirection of
//! relation targets and matcher compilation happen in
//! [`crate::resolve`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use relnorm_model::{Result, SchemaError};

/// Declaration of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityTypeDefinition {
    /// Intrinsic scalar columns.
    pub attributes: Vec<String>,
    /// Relation token to target type, stored as `{token}--{attr}` or `{token}_id`.
    pub forward_relations: BTreeMap<String, String>,
    /// Relation token to target type for one-to-many facts.
    #[serde(alias = "reverse_relations")]
    pub multivalued_columns: BTreeMap<String, String>,
    /// For each multivalued column, the target attribute pointing back here.
    #[serde(alias = "back_references")]
    pub reverse_relation_names: BTreeMap<String, String>,
    /// Base names that may appear as `{base}-{n}`.
    pub repeating_columns: Vec<String>,
    /// Attributes a row must have to be retained when split off.
    pub required_attributes: Vec<String>,
    /// Column to allowed values.
    pub enum_columns: BTreeMap<String, Vec<String>>,
    #[serde(alias = "parent_table")]
    pub parent_type: Option<String>,
    #[serde(alias = "child_tables")]
    pub child_types: Vec<String>,
}

/// A whole schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    pub types: BTreeMap<String, EntityTypeDefinition>,
}

impl SchemaDocument {
    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| SchemaError::Parse {
            message: e.to_string(),
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| SchemaError::Parse {
            message: e.to_string(),
        })
    }

    /// Read a document from disk, choosing the decoder by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&source),
            "json" => Self::from_json_str(&source),
            _ => Err(SchemaError::UnsupportedFormat { extension }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EntityTypeDefinition> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Chain of ancestors, nearest first. Stops at unknown names and cycles.
    pub fn ancestors(&self, name: &str) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = self.get(name).and_then(|def| def.parent_type.as_deref());
        while let Some(parent) = current {
            if parent == name || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.get(parent).and_then(|def| def.parent_type.as_deref());
        }
        chain
    }

    /// Direct children: declared `child_types` plus types naming this one as parent.
    pub fn children(&self, name: &str) -> Vec<&str> {
        let mut children: Vec<&str> = self
            .get(name)
            .map(|def| def.child_types.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for (other, def) in &self.types {
            if def.parent_type.as_deref() == Some(name) && !children.contains(&other.as_str()) {
                children.push(other);
            }
        }
        children.retain(|child| self.contains(child));
        children
    }

    /// All descendants, depth first.
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        let mut found: Vec<&str> = Vec::new();
        let mut queue = self.children(name);
        while let Some(child) = queue.pop() {
            if child == name || found.contains(&child) {
                continue;
            }
            found.push(child);
            queue.extend(self.children(child));
        }
        found
    }

    /// Topmost ancestor of a type (the type itself when it has no parent).
    pub fn root_of<'a>(&'a self, name: &'a str) -> &'a str {
        self.ancestors(name).last().copied().unwrap_or(name)
    }
}
