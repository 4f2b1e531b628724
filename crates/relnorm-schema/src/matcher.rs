//! Compiled column-token matchers.

use regex::Regex;

use relnorm_model::{Result, SchemaError};

/// Anchored alternation over a set of names.
///
/// An empty set compiles to a matcher that matches nothing rather than an
/// empty alternation (which would match every token).
#[derive(Debug, Clone, Default)]
pub struct TokenMatcher {
    pattern: Option<Regex>,
}

impl TokenMatcher {
    /// Match any of `names` exactly.
    pub fn exact<'a, I>(table_type: &str, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let alternatives: Vec<String> = names.into_iter().map(regex::escape).collect();
        Self::compile(table_type, &alternatives, "")
    }

    /// Match `{name}-{n}` for any of `names`.
    pub fn repeating<'a, I>(table_type: &str, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let alternatives: Vec<String> = names.into_iter().map(regex::escape).collect();
        Self::compile(table_type, &alternatives, r"-\d+")
    }

    fn compile(table_type: &str, alternatives: &[String], suffix: &str) -> Result<Self> {
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let source = format!("^(?:{}){suffix}$", alternatives.join("|"));
        let pattern = Regex::new(&source).map_err(|e| SchemaError::Pattern {
            table_type: table_type.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_match(&self, token: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(token))
    }

    /// Source of the compiled pattern, if any.
    pub fn as_str(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }
}

/// The four matchers derived once per resolved entity type.
#[derive(Debug, Clone, Default)]
pub struct CompiledMatchers {
    pub attributes: TokenMatcher,
    pub repeating_columns: TokenMatcher,
    pub forward_relations: TokenMatcher,
    pub multivalued_columns: TokenMatcher,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_matches_nothing() {
        let matcher = TokenMatcher::exact("Empty", std::iter::empty()).expect("compile");
        assert!(!matcher.is_match(""));
        assert!(!matcher.is_match("anything"));
        assert!(matcher.as_str().is_none());
    }

    #[test]
    fn exact_match_is_anchored() {
        let matcher = TokenMatcher::exact("Transactor", ["name", "state"]).expect("compile");
        assert!(matcher.is_match("name"));
        assert!(!matcher.is_match("first_name"));
        assert!(!matcher.is_match("names"));
    }

    #[test]
    fn escapes_metacharacters() {
        let matcher = TokenMatcher::exact("Odd", ["a.b"]).expect("compile");
        assert!(matcher.is_match("a.b"));
        assert!(!matcher.is_match("axb"));
    }

    #[test]
    fn repeating_requires_numeric_suffix() {
        let matcher = TokenMatcher::repeating("Transaction", ["amount"]).expect("compile");
        assert!(matcher.is_match("amount-1"));
        assert!(matcher.is_match("amount-12"));
        assert!(!matcher.is_match("amount"));
        assert!(!matcher.is_match("amount-x"));
    }
}
