//! Trellis Core Library
//!
//! Core functionality for the trellis schema synchronization tool.
//! Provides model declarations, deferred schema directives, and graph
//! database backends.

pub mod backend;
pub mod gate;
pub mod manifest;
pub mod model;
pub mod persist;
pub mod sync;

use serde::{Deserialize, Serialize};

/// Kind of schema constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    #[default]
    Unique,
}

impl ConstraintKind {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Unique => "unique",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unique" => Ok(ConstraintKind::Unique),
            _ => Err(format!("Unknown constraint kind: {}", s)),
        }
    }
}

/// A constraint specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConstraintSpec {
    pub kind: ConstraintKind,
}

impl ConstraintSpec {
    /// The unique-constraint spec
    pub fn unique() -> Self {
        Self {
            kind: ConstraintKind::Unique,
        }
    }
}

/// A deferred schema operation declared against a model type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDirective {
    /// Property should be index-backed
    EnsureIndex { property: String },
    /// Property should be constraint-backed
    EnsureConstraint {
        property: String,
        spec: ConstraintSpec,
    },
    /// Remove the index for a property, optionally on a specific label
    DropIndex {
        property: String,
        label: Option<String>,
    },
    /// Remove the constraint for a property
    DropConstraint {
        property: String,
        spec: ConstraintSpec,
    },
}

impl SchemaDirective {
    /// The property this directive targets
    pub fn property(&self) -> &str {
        match self {
            SchemaDirective::EnsureIndex { property }
            | SchemaDirective::EnsureConstraint { property, .. }
            | SchemaDirective::DropIndex { property, .. }
            | SchemaDirective::DropConstraint { property, .. } => property,
        }
    }
}

impl std::fmt::Display for SchemaDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaDirective::EnsureIndex { property } => write!(f, "index {}", property),
            SchemaDirective::EnsureConstraint { property, spec } => {
                write!(f, "{} constraint {}", spec.kind, property)
            }
            SchemaDirective::DropIndex {
                property,
                label: Some(label),
            } => write!(f, "drop index {} on :{}", property, label),
            SchemaDirective::DropIndex {
                property,
                label: None,
            } => write!(f, "drop index {}", property),
            SchemaDirective::DropConstraint { property, spec } => {
                write!(f, "drop {} constraint {}", spec.kind, property)
            }
        }
    }
}

/// A property value carried by the persistence helpers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

/// Check a label or property name before it is interpolated into query text.
///
/// Accepts letters, digits, and underscores, not starting with a digit.
pub(crate) fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_kind_round_trip() {
        assert_eq!("unique".parse::<ConstraintKind>(), Ok(ConstraintKind::Unique));
        assert_eq!(ConstraintKind::Unique.to_string(), "unique");
        assert!("mandatory".parse::<ConstraintKind>().is_err());
    }

    #[test]
    fn test_valid_identifier() {
        assert!(valid_identifier("email"));
        assert!(valid_identifier("_private"));
        assert!(valid_identifier("User2"));
        assert!(!valid_identifier("2fast"));
        assert!(!valid_identifier("drop index"));
        assert!(!valid_identifier(""));
        assert!(!valid_identifier("n.prop"));
    }
}
