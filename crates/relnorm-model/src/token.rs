//! Compound column naming.
//!
//! Column names are `--`-delimited token paths. Every token is resolved
//! against the entity type reached so far: `donor--address--city` reads
//! `donor` on the origin type, `address` on the donor's type and `city` on
//! the address type.

use serde::{Deserialize, Serialize};

use crate::form::NormalForm;

/// Delimiter between tokens of a compound column name.
pub const SPLIT: &str = "--";

/// Suffix of a foreign-key column written back after a split.
pub const ID_SUFFIX: &str = "_id";

/// Surrogate primary-key column.
pub const ID_COLUMN: &str = "id";

/// Separator between a repeating column's base name and its instance index.
pub const REPEAT_SEPARATOR: char = '-';

/// A single resolved token of a compound column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnToken {
    /// Intrinsic scalar fact, always terminal.
    Attribute(String),
    /// Instance `instance` of a repeating group rooted at `base`.
    RepeatingGroup { base: String, instance: u32 },
    /// Many-to-one reference to `target`.
    ForwardRelation { name: String, target: String },
    /// One-to-many fact stored as rows of `target`.
    MultivaluedRelation { name: String, target: String },
}

impl ColumnToken {
    /// Normal form a column containing this token is at most in.
    pub fn normal_form(&self) -> NormalForm {
        match self {
            ColumnToken::RepeatingGroup { .. } => NormalForm::Unnormalized,
            ColumnToken::ForwardRelation { .. } => NormalForm::FirstNormalForm,
            ColumnToken::MultivaluedRelation { .. } => NormalForm::ThirdNormalForm,
            ColumnToken::Attribute(_) => NormalForm::FourthNormalForm,
        }
    }

    /// Entity type the walk continues into, for relation tokens.
    pub fn target(&self) -> Option<&str> {
        match self {
            ColumnToken::ForwardRelation { target, .. }
            | ColumnToken::MultivaluedRelation { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ColumnToken::Attribute(_) | ColumnToken::RepeatingGroup { .. }
        )
    }
}

/// Iterate the tokens of a compound column name.
pub fn tokens(column: &str) -> impl Iterator<Item = &str> {
    column.split(SPLIT)
}

/// First token of a compound column name (the relation prefix, if any).
pub fn first_token(column: &str) -> &str {
    column.split_once(SPLIT).map_or(column, |(head, _)| head)
}

/// `{prefix}--{column}`.
pub fn prefixed(prefix: &str, column: &str) -> String {
    format!("{prefix}{SPLIT}{column}")
}

/// Strip `{prefix}--` from `column`, if present.
pub fn strip_relation_prefix<'a>(column: &'a str, prefix: &str) -> Option<&'a str> {
    column
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SPLIT))
        .filter(|rest| !rest.is_empty())
}

/// `{relation}_id`.
pub fn relation_id_column(relation: &str) -> String {
    format!("{relation}{ID_SUFFIX}")
}

/// Split a repeating-group token into base name and instance index.
///
/// Only the trailing separator counts: `line-item-2` is base `line-item`,
/// instance 2.
pub fn split_repeating(token: &str) -> Option<(&str, u32)> {
    let (base, instance) = token.rsplit_once(REPEAT_SEPARATOR)?;
    if base.is_empty() || instance.is_empty() || !instance.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    instance.parse().ok().map(|instance| (base, instance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_token_of_plain_and_compound_names() {
        assert_eq!(first_token("amount"), "amount");
        assert_eq!(first_token("donor--name"), "donor");
        assert_eq!(first_token("donor--address--city"), "donor");
    }

    #[test]
    fn strips_only_whole_prefixes() {
        assert_eq!(strip_relation_prefix("donor--name", "donor"), Some("name"));
        assert_eq!(
            strip_relation_prefix("donor--address--city", "donor"),
            Some("address--city")
        );
        assert_eq!(strip_relation_prefix("donors--name", "donor"), None);
        assert_eq!(strip_relation_prefix("donor_id", "donor"), None);
        assert_eq!(strip_relation_prefix("donor--", "donor"), None);
    }

    #[test]
    fn splits_repeating_suffix() {
        assert_eq!(split_repeating("amount-1"), Some(("amount", 1)));
        assert_eq!(split_repeating("line-item-12"), Some(("line-item", 12)));
        assert_eq!(split_repeating("amount"), None);
        assert_eq!(split_repeating("amount-x"), None);
        assert_eq!(split_repeating("-3"), None);
    }

    #[test]
    fn token_levels() {
        let token = ColumnToken::ForwardRelation {
            name: "donor".to_string(),
            target: "Transactor".to_string(),
        };
        assert_eq!(token.normal_form(), NormalForm::FirstNormalForm);
        assert_eq!(token.target(), Some("Transactor"));
        assert!(!token.is_terminal());
        assert!(ColumnToken::Attribute("name".to_string()).is_terminal());
    }
}
