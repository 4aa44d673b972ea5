//! In-memory backend for tests and embedding
//!
//! Mimics server behavior: creating an index or constraint that already
//! exists is an error, and so is dropping one that does not. Create calls
//! are counted so idempotence is observable from tests.

use super::{BackendError, BackendResult, SchemaBackend};
use crate::ConstraintSpec;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    /// label -> set of index property tuples
    indexes: BTreeMap<String, BTreeSet<Vec<String>>>,
    /// (label, property) pairs with a unique constraint
    constraints: BTreeSet<(String, String)>,
    index_creates: usize,
    constraint_creates: usize,
    queries: Vec<String>,
}

/// In-process schema backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an index directly, bypassing the create counter.
    ///
    /// Test setup for "the label already has this index" scenarios.
    pub fn seed_index(&self, label: &str, properties: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .indexes
            .entry(label.to_string())
            .or_default()
            .insert(properties.iter().map(|p| p.to_string()).collect());
    }

    /// Install a unique constraint directly, bypassing the create counter
    pub fn seed_constraint(&self, label: &str, property: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .constraints
            .insert((label.to_string(), property.to_string()));
    }

    /// Number of create_index calls that reached the backend
    pub fn index_creates(&self) -> usize {
        self.state.lock().unwrap().index_creates
    }

    /// Number of create_constraint calls that reached the backend
    pub fn constraint_creates(&self) -> usize {
        self.state.lock().unwrap().constraint_creates
    }

    /// Write queries executed through `run`, in order
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl SchemaBackend for MemoryBackend {
    async fn indexes(&self, label: &str) -> BackendResult<Vec<Vec<String>>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .indexes
            .get(label)
            .map(|tuples| tuples.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_index(&self, label: &str, property: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let tuple = vec![property.to_string()];
        let created = state
            .indexes
            .entry(label.to_string())
            .or_default()
            .insert(tuple);
        if !created {
            return Err(BackendError::Schema(format!(
                "index already exists on :{}({})",
                label, property
            )));
        }
        state.index_creates += 1;
        Ok(())
    }

    async fn drop_index(&self, label: &str, property: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let tuple = vec![property.to_string()];
        let removed = state
            .indexes
            .get_mut(label)
            .map(|tuples| tuples.remove(&tuple))
            .unwrap_or(false);
        if !removed {
            return Err(BackendError::Schema(format!(
                "no index on :{}({})",
                label, property
            )));
        }
        Ok(())
    }

    async fn constraint_exists(&self, label: &str, property: &str) -> BackendResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .constraints
            .contains(&(label.to_string(), property.to_string())))
    }

    async fn create_constraint(
        &self,
        label: &str,
        property: &str,
        _spec: ConstraintSpec,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let created = state
            .constraints
            .insert((label.to_string(), property.to_string()));
        if !created {
            return Err(BackendError::Schema(format!(
                "constraint already exists on :{}({})",
                label, property
            )));
        }
        state.constraint_creates += 1;
        Ok(())
    }

    async fn drop_constraint(
        &self,
        label: &str,
        property: &str,
        _spec: ConstraintSpec,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let removed = state
            .constraints
            .remove(&(label.to_string(), property.to_string()));
        if !removed {
            return Err(BackendError::Schema(format!(
                "no constraint on :{}({})",
                label, property
            )));
        }
        Ok(())
    }

    async fn run(&self, query: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_create_is_an_error() {
        let backend = MemoryBackend::new();
        backend.create_index("User", "email").await.unwrap();
        assert!(backend.create_index("User", "email").await.is_err());
        assert_eq!(backend.index_creates(), 1);

        backend
            .create_constraint("User", "email", ConstraintSpec::unique())
            .await
            .unwrap();
        assert!(backend
            .create_constraint("User", "email", ConstraintSpec::unique())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_drop_of_missing_object_is_an_error() {
        let backend = MemoryBackend::new();
        assert!(backend.drop_index("User", "email").await.is_err());
        assert!(backend
            .drop_constraint("User", "email", ConstraintSpec::unique())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_indexes_are_reported_per_label() {
        let backend = MemoryBackend::new();
        backend.create_index("User", "email").await.unwrap();
        backend.create_index("Post", "slug").await.unwrap();

        assert_eq!(backend.indexes("User").await.unwrap(), vec![vec!["email"]]);
        assert_eq!(backend.indexes("Comment").await.unwrap().len(), 0);
    }
}
