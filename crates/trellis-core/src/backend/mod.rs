//! Graph database backends
//!
//! Defines the schema contract between the synchronizer and a database,
//! plus label-scoped capability handles.

pub mod falkor;
pub mod memory;

pub use falkor::FalkorBackend;
pub use memory::MemoryBackend;

use crate::{valid_identifier, ConstraintSpec};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Query execution error: {0}")]
    Query(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Contract between the schema synchronizer and a graph database.
///
/// Indexes are reported as ordered tuples of property names; a
/// single-property index is a one-element tuple. Creating a schema object
/// that already exists, or dropping one that does not, is a backend error,
/// matching server behavior. Callers are expected to check first.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Existing indexes on a label
    async fn indexes(&self, label: &str) -> BackendResult<Vec<Vec<String>>>;

    /// Create a single-property index
    async fn create_index(&self, label: &str, property: &str) -> BackendResult<()>;

    /// Drop a single-property index
    async fn drop_index(&self, label: &str, property: &str) -> BackendResult<()>;

    /// Whether a unique constraint exists for (label, property)
    async fn constraint_exists(&self, label: &str, property: &str) -> BackendResult<bool>;

    /// Create a constraint on (label, property)
    async fn create_constraint(
        &self,
        label: &str,
        property: &str,
        spec: ConstraintSpec,
    ) -> BackendResult<()>;

    /// Drop a constraint on (label, property)
    async fn drop_constraint(
        &self,
        label: &str,
        property: &str,
        spec: ConstraintSpec,
    ) -> BackendResult<()>;

    /// Execute a write query (used by the persistence helpers)
    async fn run(&self, query: &str) -> BackendResult<()>;
}

/// Whether a unique constraint exists for (label, property).
///
/// Class-level form of the query, not tied to a label handle.
pub async fn constraint_exists<B: SchemaBackend + ?Sized>(
    backend: &B,
    label: &str,
    property: &str,
) -> BackendResult<bool> {
    backend.constraint_exists(label, property).await
}

/// Capability bound to a single label of one backend.
///
/// Resolved on demand and not cached; graph labels exist implicitly, so
/// resolution never touches the database.
pub struct LabelHandle<'a, B: SchemaBackend + ?Sized> {
    backend: &'a B,
    label: String,
}

impl<'a, B: SchemaBackend + ?Sized> LabelHandle<'a, B> {
    pub fn resolve(backend: &'a B, label: &str) -> Self {
        Self {
            backend,
            label: label.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Existing indexes on this label
    pub async fn indexes(&self) -> BackendResult<Vec<Vec<String>>> {
        self.backend.indexes(&self.label).await
    }

    /// Whether an exact single-property index on `property` exists.
    ///
    /// A composite index containing the property does not count.
    pub async fn has_index(&self, property: &str) -> BackendResult<bool> {
        let indexes = self.indexes().await?;
        Ok(indexes
            .iter()
            .any(|tuple| tuple.len() == 1 && tuple[0] == property))
    }

    pub async fn create_index(&self, property: &str) -> BackendResult<()> {
        self.backend.create_index(&self.label, property).await
    }

    pub async fn drop_index(&self, property: &str) -> BackendResult<()> {
        self.backend.drop_index(&self.label, property).await
    }

    pub async fn constraint_exists(&self, property: &str) -> BackendResult<bool> {
        self.backend.constraint_exists(&self.label, property).await
    }

    pub async fn create_constraint(
        &self,
        property: &str,
        spec: ConstraintSpec,
    ) -> BackendResult<()> {
        self.backend
            .create_constraint(&self.label, property, spec)
            .await
    }

    pub async fn drop_constraint(&self, property: &str, spec: ConstraintSpec) -> BackendResult<()> {
        self.backend
            .drop_constraint(&self.label, property, spec)
            .await
    }
}

/// Reject a name unfit for interpolation into query text
pub(crate) fn ensure_identifier(name: &str) -> BackendResult<&str> {
    if valid_identifier(name) {
        Ok(name)
    } else {
        Err(BackendError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_identifier() {
        assert!(ensure_identifier("User").is_ok());
        assert!(matches!(
            ensure_identifier("User) DETACH DELETE"),
            Err(BackendError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_has_index_requires_exact_single_property_match() {
        let backend = MemoryBackend::new();
        backend.seed_index("User", &["email", "name"]);

        let handle = LabelHandle::resolve(&backend, "User");
        assert!(!handle.has_index("email").await.unwrap());

        backend.seed_index("User", &["email"]);
        assert!(handle.has_index("email").await.unwrap());
    }
}
