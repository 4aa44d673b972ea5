//! Model definitions and property declarations
//!
//! Pure local bookkeeping for a model type's declared schema state.
//! Nothing here touches the database.

use std::collections::HashMap;

/// Schema identity of a model type
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// Model name
    name: String,
    /// Mapped labels; the first is the primary label. Empty means the
    /// model maps to a single label equal to its name.
    labels: Vec<String>,
    /// Identity (primary key) property
    identity: String,
}

impl ModelDef {
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            labels,
            identity: "id".to_string(),
        }
    }

    /// Override the identity property (defaults to `id`)
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The label constraints are reconciled against
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.name)
    }

    /// All labels the model maps to, in declaration order
    pub fn mapped_labels(&self) -> Vec<&str> {
        if self.labels.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.labels.iter().map(String::as_str).collect()
        }
    }

    /// Whether `property` is the model's identity property
    pub fn is_identity(&self, property: &str) -> bool {
        self.identity == property
    }
}

/// Declared schema state of a single property
#[derive(Debug, Clone, Default)]
pub struct PropertyDeclaration {
    /// Property name
    pub name: String,
    /// Backed by a plain index
    pub indexed: bool,
    /// Backed by a unique constraint
    pub constrained: bool,
}

/// Per-model property bookkeeping
///
/// Tracks which declared properties are index-backed or constraint-backed,
/// plus the ordered set of properties the model wants indexed. A property
/// is never flagged as both at once.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    declarations: HashMap<String, PropertyDeclaration>,
    indexed_properties: Vec<String>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property, returning its (possibly existing) declaration
    pub fn declare(&mut self, name: &str) -> &mut PropertyDeclaration {
        self.declarations
            .entry(name.to_string())
            .or_insert_with(|| PropertyDeclaration {
                name: name.to_string(),
                ..Default::default()
            })
    }

    /// Look up a declaration; absent properties are not an error
    pub fn get(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.declarations.get(name)
    }

    /// Flag a property as index-backed, clearing any constraint flag
    pub fn mark_indexed(&mut self, name: &str) {
        let decl = self.declare(name);
        decl.indexed = true;
        decl.constrained = false;
    }

    /// Clear the indexed flag if the declaration exists
    pub fn clear_indexed(&mut self, name: &str) {
        if let Some(decl) = self.declarations.get_mut(name) {
            decl.indexed = false;
        }
    }

    /// Flag a property as constraint-backed, clearing any index flag
    pub fn mark_constrained(&mut self, name: &str) {
        let decl = self.declare(name);
        decl.constrained = true;
        decl.indexed = false;
    }

    /// Clear the constrained flag if the declaration exists
    pub fn clear_constrained(&mut self, name: &str) {
        if let Some(decl) = self.declarations.get_mut(name) {
            decl.constrained = false;
        }
    }

    /// Append a property to the ordered indexed set, once
    pub fn record_indexed(&mut self, name: &str) {
        if !self.indexed_properties.iter().any(|p| p == name) {
            self.indexed_properties.push(name.to_string());
        }
    }

    /// Remove a property from the ordered indexed set
    pub fn remove_indexed(&mut self, name: &str) {
        self.indexed_properties.retain(|p| p != name);
    }

    /// Properties the model wants indexed, in declaration order
    pub fn indexed_properties(&self) -> &[String] {
        &self.indexed_properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_label_defaults_to_name() {
        let def = ModelDef::new("User", vec![]);
        assert_eq!(def.primary_label(), "User");
        assert_eq!(def.mapped_labels(), vec!["User"]);

        let def = ModelDef::new("Admin", vec!["Admin".into(), "User".into()]);
        assert_eq!(def.primary_label(), "Admin");
        assert_eq!(def.mapped_labels(), vec!["Admin", "User"]);
    }

    #[test]
    fn test_identity_defaults_to_id() {
        let def = ModelDef::new("User", vec![]);
        assert!(def.is_identity("id"));

        let def = ModelDef::new("User", vec![]).with_identity("uuid");
        assert!(def.is_identity("uuid"));
        assert!(!def.is_identity("id"));
    }

    #[test]
    fn test_flags_are_mutually_exclusive() {
        let mut registry = PropertyRegistry::new();

        registry.mark_indexed("email");
        assert!(registry.get("email").unwrap().indexed);

        registry.mark_constrained("email");
        let decl = registry.get("email").unwrap();
        assert!(decl.constrained);
        assert!(!decl.indexed);

        registry.mark_indexed("email");
        let decl = registry.get("email").unwrap();
        assert!(decl.indexed);
        assert!(!decl.constrained);
    }

    #[test]
    fn test_clear_on_absent_property_is_noop() {
        let mut registry = PropertyRegistry::new();
        registry.clear_indexed("never_declared");
        registry.clear_constrained("never_declared");
        assert!(registry.get("never_declared").is_none());
    }

    #[test]
    fn test_record_indexed_appends_once_in_order() {
        let mut registry = PropertyRegistry::new();
        registry.record_indexed("email");
        registry.record_indexed("name");
        registry.record_indexed("email");
        assert_eq!(registry.indexed_properties(), ["email", "name"]);

        registry.remove_indexed("email");
        assert_eq!(registry.indexed_properties(), ["name"]);
    }
}
