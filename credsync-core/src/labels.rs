use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label set attached to a stored object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert for literals in construction chains.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Labels {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Eq(String, String),
    NotEq(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(&self, labels: &Labels) -> bool {
        match self {
            Requirement::Eq(key, value) => labels.get(key) == Some(value.as_str()),
            Requirement::NotEq(key, value) => labels.get(key) != Some(value.as_str()),
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::NotExists(key) => !labels.contains_key(key),
        }
    }
}

/// Predicate over an object's label set.
///
/// A selector is a conjunction of requirements parsed from expressions such
/// as `app=sync,tier!=edge,owner,!legacy`. The empty selector matches every
/// label set. Evaluation is pure; all validation happens at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector that matches every object.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_everything(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Parse a comma-separated requirement list.
    ///
    /// Supported forms per clause: `key=value`, `key!=value`, `key`
    /// (existence) and `!key` (absence).
    pub fn parse(expression: &str) -> Result<Self> {
        let mut requirements = Vec::new();
        for clause in expression.split(',') {
            let clause = clause.trim();
            if clause.is_empty() {
                if expression.trim().is_empty() {
                    break;
                }
                return Err(invalid(expression, "empty requirement clause"));
            }
            let requirement = if let Some((key, value)) = clause.split_once("!=") {
                Requirement::NotEq(
                    validated_key(expression, key)?,
                    validated_value(expression, value)?,
                )
            } else if let Some((key, value)) = clause.split_once('=') {
                Requirement::Eq(
                    validated_key(expression, key)?,
                    validated_value(expression, value)?,
                )
            } else if let Some(key) = clause.strip_prefix('!') {
                Requirement::NotExists(validated_key(expression, key)?)
            } else {
                Requirement::Exists(validated_key(expression, clause)?)
            };
            requirements.push(requirement);
        }
        Ok(Self { requirements })
    }

    /// Evaluate the selector against a label set. Pure and side-effect free.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl std::str::FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

fn invalid(expression: &str, reason: &'static str) -> Error {
    Error::Selector {
        expression: expression.to_string(),
        reason,
    }
}

fn validated_key(expression: &str, key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid(expression, "requirement key must not be empty"));
    }
    if !key.chars().all(is_label_char) {
        return Err(invalid(expression, "requirement key contains invalid characters"));
    }
    Ok(key.to_string())
}

fn validated_value(expression: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if !value.is_empty() && !value.chars().all(is_label_char) {
        return Err(invalid(
            expression,
            "requirement value contains invalid characters",
        ));
    }
    Ok(value.to_string())
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Labels {
        Labels::new().with("app", "sync").with("tier", "edge")
    }

    #[test]
    fn everything_matches_any_label_set() {
        assert!(Selector::everything().matches(&labels()));
        assert!(Selector::everything().matches(&Labels::new()));
    }

    #[test]
    fn equality_and_inequality() {
        let selector = Selector::parse("app=sync,tier!=cache").unwrap();
        assert!(selector.matches(&labels()));

        let selector = Selector::parse("app=sync,tier!=edge").unwrap();
        assert!(!selector.matches(&labels()));
    }

    #[test]
    fn existence_and_absence() {
        let selector = Selector::parse("app,!legacy").unwrap();
        assert!(selector.matches(&labels()));

        let selector = Selector::parse("legacy").unwrap();
        assert!(!selector.matches(&labels()));
    }

    #[test]
    fn empty_expression_is_everything() {
        let selector = Selector::parse("").unwrap();
        assert!(selector.is_everything());
        assert!(selector.matches(&Labels::new()));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expression in ["=value", "app=sy nc", "a,,b", "!"] {
            let err = Selector::parse(expression).unwrap_err();
            assert!(matches!(err, Error::Selector { .. }), "{expression}");
        }
    }

    #[test]
    fn evaluation_is_pure() {
        let selector = Selector::parse("app=sync").unwrap();
        let set = labels();
        assert_eq!(selector.matches(&set), selector.matches(&set));
        assert_eq!(set.len(), 2);
    }
}
