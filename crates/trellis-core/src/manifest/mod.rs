//! Declarative schema manifests
//!
//! JSON description of the models a deployment declares, consumed by the
//! CLI to drive synchronization.

use crate::model::ModelDef;
use crate::{valid_identifier, ConstraintKind, ConstraintSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Top-level manifest: the models a deployment declares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub models: Vec<ModelManifest>,
}

/// One declared model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    /// Mapped labels; empty means the model maps to its own name
    #[serde(default)]
    pub labels: Vec<String>,
    /// Identity (primary key) property
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Properties that should be index-backed
    #[serde(default)]
    pub indexes: Vec<String>,
    /// Properties that should be constraint-backed
    #[serde(default)]
    pub constraints: Vec<ConstraintManifest>,
}

/// One declared constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintManifest {
    pub property: String,
    #[serde(default)]
    pub kind: ConstraintKind,
}

fn default_identity() -> String {
    "id".to_string()
}

impl SchemaManifest {
    /// Load and validate a manifest from a JSON file
    pub fn load(path: &Path) -> ManifestResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a manifest from a JSON string
    pub fn from_json(contents: &str) -> ManifestResult<Self> {
        let manifest: Self = serde_json::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> ManifestResult<()> {
        for model in &self.models {
            model.validate()?;
        }
        Ok(())
    }
}

impl ModelManifest {
    /// Convert to the model definition the synchronizer works with
    pub fn to_def(&self) -> ModelDef {
        ModelDef::new(self.name.clone(), self.labels.clone()).with_identity(self.identity.clone())
    }

    fn validate(&self) -> ManifestResult<()> {
        let check = |what: &str, name: &str| -> ManifestResult<()> {
            if valid_identifier(name) {
                Ok(())
            } else {
                Err(ManifestError::Invalid(format!(
                    "model {:?}: {} {:?} is not a valid identifier",
                    self.name, what, name
                )))
            }
        };

        check("model name", &self.name)?;
        check("identity property", &self.identity)?;
        for label in &self.labels {
            check("label", label)?;
        }
        for property in &self.indexes {
            check("indexed property", property)?;
        }
        for constraint in &self.constraints {
            check("constrained property", &constraint.property)?;
        }

        for constraint in &self.constraints {
            if self.indexes.iter().any(|p| p == &constraint.property) {
                return Err(ManifestError::Invalid(format!(
                    "model {:?}: property {:?} is declared both indexed and constrained",
                    self.name, constraint.property
                )));
            }
        }

        Ok(())
    }
}

impl ConstraintManifest {
    pub fn spec(&self) -> ConstraintSpec {
        ConstraintSpec { kind: self.kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_filled_in() {
        let manifest = SchemaManifest::from_json(
            r#"{"models": [{"name": "User", "indexes": ["name"]}]}"#,
        )
        .unwrap();

        let model = &manifest.models[0];
        assert_eq!(model.identity, "id");
        assert!(model.labels.is_empty());
        assert_eq!(model.to_def().primary_label(), "User");
    }

    #[test]
    fn test_constraint_kind_defaults_to_unique() {
        let manifest = SchemaManifest::from_json(
            r#"{"models": [{"name": "User", "constraints": [{"property": "email"}]}]}"#,
        )
        .unwrap();

        let constraint = &manifest.models[0].constraints[0];
        assert_eq!(constraint.kind, ConstraintKind::Unique);
        assert_eq!(constraint.spec(), ConstraintSpec::unique());
    }

    #[test]
    fn test_property_cannot_be_indexed_and_constrained() {
        let result = SchemaManifest::from_json(
            r#"{
                "models": [{
                    "name": "User",
                    "indexes": ["email"],
                    "constraints": [{"property": "email"}]
                }]
            }"#,
        );
        assert!(matches!(result, Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let result = SchemaManifest::from_json(
            r#"{"models": [{"name": "User", "indexes": ["e-mail"]}]}"#,
        );
        assert!(matches!(result, Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn test_multi_label_model() {
        let manifest = SchemaManifest::from_json(
            r#"{"models": [{"name": "Admin", "labels": ["Admin", "User"]}]}"#,
        )
        .unwrap();

        let def = manifest.models[0].to_def();
        assert_eq!(def.mapped_labels(), vec!["Admin", "User"]);
    }
}
