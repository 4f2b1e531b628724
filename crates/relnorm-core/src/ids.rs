//! Surrogate identifiers.
//!
//! Every row of a normalized table carries a UUID in `id`. Rows that arrive
//! with a caller-supplied natural key keep a stable UUID for it through the
//! [`IdMapping`], which can be persisted between runs.

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use relnorm_model::{ID_COLUMN, relation_id_column};
use relnorm_schema::EntityTypeSchema;

use crate::error::{NormalizationError, Result};
use crate::frame::{cell_text, cell_text_by_name, has_column, string_column};

/// Scope column: the same raw id in different years names different records.
pub const YEAR_COLUMN: &str = "year";
/// Scope column: the same raw id from different states names different records.
pub const REPORTED_STATE_COLUMN: &str = "reported_state";

/// Source of fresh surrogate identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic, UUID-shaped identifiers for tests and reproducible runs.
///
/// Produces `00000000-0000-4000-8000-000000000000`,
/// `00000000-0000-4000-8000-000000000001`, ...
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        let id = format!("00000000-0000-4000-8000-{:012}", self.next);
        self.next += 1;
        id
    }
}

/// Whether `value` is already a UUID v4.
pub fn is_uuid(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok_and(|uuid| uuid.get_version_num() == 4)
}

/// Canonical text of a raw id, so `1` and `1.0` name the same record.
pub fn normalize_raw_id(value: &str) -> String {
    let trimmed = value.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.')
        && !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b == b'0')
    {
        return whole.to_string();
    }
    trimmed.to_string()
}

/// Scope a raw id is unique within.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdKey {
    pub raw: String,
    pub table_type: String,
    pub year: Option<String>,
    pub reported_state: Option<String>,
}

impl IdKey {
    /// Key for a raw id found in `row` of `table`.
    pub fn for_row(raw: &str, table_type: &str, table: &DataFrame, row: usize) -> Self {
        Self {
            raw: normalize_raw_id(raw),
            table_type: table_type.to_string(),
            year: cell_text_by_name(table, YEAR_COLUMN, row),
            reported_state: cell_text_by_name(table, REPORTED_STATE_COLUMN, row),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MappingEntry {
    #[serde(flatten)]
    key: IdKey,
    id: String,
}

/// Raw natural key to UUID.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdMapping {
    entries: BTreeMap<IdKey, String>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &IdKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// UUID for `key`, minting one on first sight.
    pub fn get_or_assign(&mut self, key: IdKey, generator: &mut dyn IdGenerator) -> String {
        self.entries
            .entry(key)
            .or_insert_with(|| generator.next_id())
            .clone()
    }

    /// Load a mapping written by [`IdMapping::save`]. A missing file is an empty mapping.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path).map_err(|source| {
            NormalizationError::IdMappingIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let entries: Vec<MappingEntry> =
            serde_json::from_str(&source).map_err(|source| NormalizationError::IdMappingFormat {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded id mapping");
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key, entry.id))
                .collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_error = |source| NormalizationError::IdMappingIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let entries: Vec<MappingEntry> = self
            .entries
            .iter()
            .map(|(key, id)| MappingEntry {
                key: key.clone(),
                id: id.clone(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(|source| {
            NormalizationError::IdMappingFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(io_error)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "saved id mapping");
        Ok(())
    }
}

/// Give every row a UUID `id` and map raw foreign keys.
///
/// Null ids get fresh UUIDs, UUID v4 values are kept and anything else is
/// a raw id resolved through `mapping` under the type's storage type. Non-null
/// `{relation}_id` values are resolved the same way under the relation's
/// target type.
pub fn assign_ids(
    table: &DataFrame,
    schema: &EntityTypeSchema,
    mapping: &mut IdMapping,
    generator: &mut dyn IdGenerator,
) -> Result<DataFrame> {
    let mut result = table.clone();
    let height = table.height();

    let ids: Vec<Option<String>> = match table.column(ID_COLUMN) {
        Ok(column) => (0..height)
            .map(|row| {
                Some(match cell_text(column, row) {
                    None => generator.next_id(),
                    Some(value) if is_uuid(&value) => value,
                    Some(raw) => mapping.get_or_assign(
                        IdKey::for_row(&raw, schema.storage_type(), table, row),
                        generator,
                    ),
                })
            })
            .collect(),
        Err(_) => (0..height).map(|_| Some(generator.next_id())).collect(),
    };
    result.with_column(string_column(ID_COLUMN, ids))?;

    for (relation, target) in schema.forward_relations() {
        let key_column = relation_id_column(relation);
        if !has_column(table, &key_column) {
            continue;
        }
        let column = table.column(&key_column)?;
        let keys: Vec<Option<String>> = (0..height)
            .map(|row| {
                cell_text(column, row).map(|value| {
                    if is_uuid(&value) {
                        value
                    } else {
                        mapping.get_or_assign(IdKey::for_row(&value, target, table, row), generator)
                    }
                })
            })
            .collect();
        result.with_column(string_column(&key_column, keys))?;
    }
    Ok(result)
}
