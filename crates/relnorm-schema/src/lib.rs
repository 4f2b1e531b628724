//! Schema model for relational normalization.
//!
//! A schema document declares, per entity type, which column tokens are
//! attributes, relations and repeating groups. Loading a document
//! validates it as a whole, then resolves every type once for the chosen
//! inheritance mode into an immutable [`EntityTypeSchema`] held by a
//! [`SchemaRegistry`].
//!
//! ```yaml
//! Transaction:
//!   attributes: [id, amount, donor_id]
//!   forward_relations: {donor: Transactor}
//!   repeating_columns: [amount]
//! Transactor:
//!   attributes: [id, name, state]
//!   required_attributes: [name]
//! ```

pub mod document;
pub mod entity;
pub mod matcher;
pub mod registry;
pub mod resolve;
pub mod validate;

pub use document::{EntityTypeDefinition, SchemaDocument};
pub use entity::EntityTypeSchema;
pub use matcher::TokenMatcher;
pub use registry::{Reference, SchemaRegistry};
pub use resolve::resolve_entity;
pub use validate::validate_document;
