//! Schema synchronizer
//!
//! Reconciles a model's declared index/constraint state against the live
//! database schema. A property is never left both index-backed and
//! constraint-backed, and creation never duplicates an existing schema
//! object. All mutations are deferred through the model's session gate.

use crate::backend::{constraint_exists, BackendError, LabelHandle, SchemaBackend};
use crate::gate::{PendingTask, SessionGate, TaskHandle};
use crate::model::{ModelDef, PropertyRegistry};
use crate::{ConstraintSpec, SchemaDirective};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Schema task canceled before a session became available")]
    Canceled,
}

/// Result type for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Class-level schema surface for one model type.
///
/// Declaration calls (`index`, `constraint`, `drop_index`,
/// `drop_constraint`) never fail synchronously: each returns a
/// [`TaskHandle`] that resolves once the directive has run against a
/// backend. Directives submitted before [`open`](ModelSchema::open) execute
/// in submission order when the gate opens; later ones execute immediately.
pub struct ModelSchema<B: SchemaBackend> {
    def: ModelDef,
    registry: Mutex<PropertyRegistry>,
    gate: SessionGate<B>,
}

impl<B: SchemaBackend> ModelSchema<B> {
    pub fn new(def: ModelDef) -> Self {
        Self {
            def,
            registry: Mutex::new(PropertyRegistry::new()),
            gate: SessionGate::new(),
        }
    }

    pub fn def(&self) -> &ModelDef {
        &self.def
    }

    /// Local view: is the property flagged as index-backed
    pub async fn declared_indexed(&self, property: &str) -> bool {
        self.registry
            .lock()
            .await
            .get(property)
            .is_some_and(|decl| decl.indexed)
    }

    /// Local view: is the property flagged as constraint-backed
    pub async fn declared_constrained(&self, property: &str) -> bool {
        self.registry
            .lock()
            .await
            .get(property)
            .is_some_and(|decl| decl.constrained)
    }

    /// Properties the model wants indexed, in declaration order
    pub async fn indexed_properties(&self) -> Vec<String> {
        self.registry.lock().await.indexed_properties().to_vec()
    }

    /// Declare that `property` should be index-backed
    pub async fn index(&self, property: &str) -> TaskHandle {
        self.submit(SchemaDirective::EnsureIndex {
            property: property.to_string(),
        })
        .await
    }

    /// Declare that `property` should be constraint-backed
    pub async fn constraint(&self, property: &str, spec: ConstraintSpec) -> TaskHandle {
        self.submit(SchemaDirective::EnsureConstraint {
            property: property.to_string(),
            spec,
        })
        .await
    }

    /// Remove the index for `property`, on `label` if given, else on the
    /// primary label
    pub async fn drop_index(&self, property: &str, label: Option<&str>) -> TaskHandle {
        self.submit(SchemaDirective::DropIndex {
            property: property.to_string(),
            label: label.map(String::from),
        })
        .await
    }

    /// Remove the constraint for `property` (unique if no spec is given)
    pub async fn drop_constraint(
        &self,
        property: &str,
        spec: Option<ConstraintSpec>,
    ) -> TaskHandle {
        self.submit(SchemaDirective::DropConstraint {
            property: property.to_string(),
            spec: spec.unwrap_or_default(),
        })
        .await
    }

    /// Open the gate: execute queued directives in submission order.
    ///
    /// Directives submitted afterwards execute immediately against the
    /// given backend. Each directive's result is delivered through its
    /// handle; execution errors do not stop the drain.
    pub async fn open(&self, backend: Arc<B>) {
        let drained = self.gate.open_with(Arc::clone(&backend)).await;
        for task in drained {
            let result = self.apply(backend.as_ref(), &task.directive).await;
            let _ = task.done.send(result);
        }
    }

    /// Live query: does the primary label have an exact single-property
    /// index on `property`
    pub async fn has_index(&self, backend: &B, property: &str) -> SyncResult<bool> {
        let handle = LabelHandle::resolve(backend, self.def.primary_label());
        Ok(handle.has_index(property).await?)
    }

    async fn submit(&self, directive: SchemaDirective) -> TaskHandle {
        let (task, handle) = PendingTask::new(directive);
        if let Some((backend, task)) = self.gate.enqueue(task).await {
            let result = self.apply(backend.as_ref(), &task.directive).await;
            let _ = task.done.send(result);
        }
        handle
    }

    async fn apply(&self, backend: &B, directive: &SchemaDirective) -> SyncResult<()> {
        debug!(model = %self.def.name(), "Applying directive: {}", directive);
        match directive {
            SchemaDirective::EnsureIndex { property } => {
                self.ensure_index(backend, property).await
            }
            SchemaDirective::EnsureConstraint { property, spec } => {
                self.ensure_constraint(backend, property, *spec).await
            }
            SchemaDirective::DropIndex { property, label } => {
                self.execute_drop_index(backend, property, label.as_deref())
                    .await
            }
            SchemaDirective::DropConstraint { property, spec } => {
                self.execute_drop_constraint(backend, property, *spec).await
            }
        }
    }

    /// Index reconciliation: a request for a plain index downgrades any
    /// unique constraint on the property, then creates the index on every
    /// mapped label that does not already have it.
    async fn ensure_index(&self, backend: &B, property: &str) -> SyncResult<()> {
        let primary = self.def.primary_label();

        if constraint_exists(backend, primary, property).await? {
            debug!(
                "Dropping unique constraint on :{}({}) before indexing",
                primary, property
            );
            LabelHandle::resolve(backend, primary)
                .drop_constraint(property, ConstraintSpec::unique())
                .await?;
        }

        {
            let mut registry = self.registry.lock().await;
            // The identity property is implicitly unique; only the local
            // flag is exempt, the database call still happens.
            if !self.def.is_identity(property) {
                registry.mark_indexed(property);
            }
            registry.record_indexed(property);
        }

        self.apply_index_to_mapped_labels(backend, property).await
    }

    /// Create the index on every mapped label that does not already have
    /// it. Labels are independent; ordering across them does not matter.
    async fn apply_index_to_mapped_labels(&self, backend: &B, property: &str) -> SyncResult<()> {
        for label in self.def.mapped_labels() {
            let handle = LabelHandle::resolve(backend, label);
            if handle.has_index(property).await? {
                debug!("Index on :{}({}) already exists", label, property);
                continue;
            }
            handle.create_index(property).await?;
        }
        Ok(())
    }

    /// Constraint reconciliation: a no-op if the constraint already
    /// exists; otherwise any plain index on the property is dropped first,
    /// since the constraint subsumes it.
    async fn ensure_constraint(
        &self,
        backend: &B,
        property: &str,
        spec: ConstraintSpec,
    ) -> SyncResult<()> {
        let primary = self.def.primary_label();

        if constraint_exists(backend, primary, property).await? {
            debug!(
                "Unique constraint on :{}({}) already exists",
                primary, property
            );
            return Ok(());
        }

        let handle = LabelHandle::resolve(backend, primary);
        if handle.has_index(property).await? {
            debug!(
                "Dropping index on :{}({}) before constraining",
                primary, property
            );
            handle.drop_index(property).await?;
        }

        if !self.def.is_identity(property) {
            self.registry.lock().await.mark_constrained(property);
        }

        handle.create_constraint(property, spec).await?;
        Ok(())
    }

    async fn execute_drop_index(
        &self,
        backend: &B,
        property: &str,
        label: Option<&str>,
    ) -> SyncResult<()> {
        {
            let mut registry = self.registry.lock().await;
            registry.clear_indexed(property);
            registry.remove_indexed(property);
        }

        let label = label.unwrap_or_else(|| self.def.primary_label());
        LabelHandle::resolve(backend, label)
            .drop_index(property)
            .await?;
        Ok(())
    }

    async fn execute_drop_constraint(
        &self,
        backend: &B,
        property: &str,
        spec: ConstraintSpec,
    ) -> SyncResult<()> {
        self.registry.lock().await.clear_constrained(property);

        LabelHandle::resolve(backend, self.def.primary_label())
            .drop_constraint(property, spec)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn user_schema() -> ModelSchema<MemoryBackend> {
        ModelSchema::new(ModelDef::new("User", vec![]))
    }

    #[tokio::test]
    async fn test_ensure_index_on_fresh_property() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());

        let handle = schema.index("email").await;
        schema.open(Arc::clone(&backend)).await;
        handle.wait().await.unwrap();

        assert!(schema.has_index(&backend, "email").await.unwrap());
        assert!(!backend.constraint_exists("User", "email").await.unwrap());
        assert!(schema.declared_indexed("email").await);
        assert_eq!(schema.indexed_properties().await, ["email"]);
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());

        let first = schema.index("email").await;
        let second = schema.index("email").await;
        schema.open(Arc::clone(&backend)).await;
        first.wait().await.unwrap();
        second.wait().await.unwrap();

        schema.index("email").await.wait().await.unwrap();
        assert_eq!(backend.index_creates(), 1);
    }

    #[tokio::test]
    async fn test_constraint_replaces_existing_index() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        schema.open(Arc::clone(&backend)).await;

        schema.index("email").await.wait().await.unwrap();
        schema
            .constraint("email", ConstraintSpec::unique())
            .await
            .wait()
            .await
            .unwrap();

        assert!(!schema.has_index(&backend, "email").await.unwrap());
        assert!(backend.constraint_exists("User", "email").await.unwrap());
        assert!(!schema.declared_indexed("email").await);
        assert!(schema.declared_constrained("email").await);
    }

    #[tokio::test]
    async fn test_index_replaces_existing_constraint() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        schema.open(Arc::clone(&backend)).await;

        schema
            .constraint("email", ConstraintSpec::unique())
            .await
            .wait()
            .await
            .unwrap();
        schema.index("email").await.wait().await.unwrap();

        assert!(schema.has_index(&backend, "email").await.unwrap());
        assert!(!backend.constraint_exists("User", "email").await.unwrap());
        assert!(schema.declared_indexed("email").await);
        assert!(!schema.declared_constrained("email").await);
    }

    #[tokio::test]
    async fn test_existing_constraint_is_not_recreated() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_constraint("User", "email");
        schema.open(Arc::clone(&backend)).await;

        schema
            .constraint("email", ConstraintSpec::unique())
            .await
            .wait()
            .await
            .unwrap();

        assert_eq!(backend.constraint_creates(), 0);
    }

    #[tokio::test]
    async fn test_index_fans_out_to_all_mapped_labels() {
        let schema: ModelSchema<MemoryBackend> = ModelSchema::new(ModelDef::new(
            "Admin",
            vec!["Admin".to_string(), "User".to_string()],
        ));
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_index("Admin", &["email"]);
        schema.open(Arc::clone(&backend)).await;

        schema.index("email").await.wait().await.unwrap();

        // Admin already had the index; only User gets a new one.
        assert_eq!(backend.index_creates(), 1);
        assert_eq!(backend.indexes("User").await.unwrap(), vec![vec!["email"]]);
    }

    #[tokio::test]
    async fn test_identity_property_is_exempt_from_local_flagging() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        schema.open(Arc::clone(&backend)).await;

        schema.index("id").await.wait().await.unwrap();

        assert!(!schema.declared_indexed("id").await);
        assert!(schema.has_index(&backend, "id").await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_index_without_declaration_succeeds() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_index("User", &["email"]);
        schema.open(Arc::clone(&backend)).await;

        schema
            .drop_index("email", None)
            .await
            .wait()
            .await
            .unwrap();

        assert!(!schema.has_index(&backend, "email").await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_index_targets_given_label() {
        let schema: ModelSchema<MemoryBackend> = ModelSchema::new(ModelDef::new(
            "Admin",
            vec!["Admin".to_string(), "User".to_string()],
        ));
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_index("Admin", &["email"]);
        backend.seed_index("User", &["email"]);
        schema.open(Arc::clone(&backend)).await;

        schema
            .drop_index("email", Some("User"))
            .await
            .wait()
            .await
            .unwrap();

        assert_eq!(backend.indexes("User").await.unwrap().len(), 0);
        assert_eq!(backend.indexes("Admin").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queued_directives_execute_in_order_on_open() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());

        let index = schema.index("email").await;
        let constraint = schema.constraint("email", ConstraintSpec::unique()).await;
        schema.open(Arc::clone(&backend)).await;

        index.wait().await.unwrap();
        constraint.wait().await.unwrap();

        // Last writer wins: the constraint directive ran second.
        assert!(!schema.has_index(&backend, "email").await.unwrap());
        assert!(backend.constraint_exists("User", "email").await.unwrap());
    }

    #[tokio::test]
    async fn test_queued_constraint_then_index_leaves_an_index() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());

        let constraint = schema.constraint("email", ConstraintSpec::unique()).await;
        let index = schema.index("email").await;
        schema.open(Arc::clone(&backend)).await;

        constraint.wait().await.unwrap();
        index.wait().await.unwrap();

        assert!(schema.has_index(&backend, "email").await.unwrap());
        assert!(!backend.constraint_exists("User", "email").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_errors_surface_through_the_handle() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        schema.open(Arc::clone(&backend)).await;

        // No index to drop: the backend error reaches the caller unwrapped.
        let result = schema.drop_index("email", None).await.wait().await;
        assert!(matches!(result, Err(SyncError::Backend(_))));
    }

    #[tokio::test]
    async fn test_drop_constraint_clears_local_flag() {
        let schema = user_schema();
        let backend = Arc::new(MemoryBackend::new());
        schema.open(Arc::clone(&backend)).await;

        schema
            .constraint("email", ConstraintSpec::unique())
            .await
            .wait()
            .await
            .unwrap();
        schema
            .drop_constraint("email", None)
            .await
            .wait()
            .await
            .unwrap();

        assert!(!schema.declared_constrained("email").await);
        assert!(!backend.constraint_exists("User", "email").await.unwrap());
    }
}
