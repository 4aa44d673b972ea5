//! FalkorDB backend
//!
//! Live schema operations over the falkordb client. Everything goes
//! through raw queries on a single graph connection; index and constraint
//! introspection use the `db.indexes()` / `db.constraints()` procedures.

use super::{ensure_identifier, BackendError, BackendResult, SchemaBackend};
use crate::{ConstraintKind, ConstraintSpec};
use async_trait::async_trait;
use falkordb::{AsyncGraph, FalkorClientBuilder, FalkorConnectionInfo, FalkorValue};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Schema backend bound to one FalkorDB graph
pub struct FalkorBackend {
    graph: Arc<Mutex<AsyncGraph>>,
    graph_name: String,
}

impl FalkorBackend {
    /// Connect to FalkorDB and select the graph
    pub async fn connect(connection_uri: Option<&str>, graph_name: &str) -> BackendResult<Self> {
        let uri = connection_uri.unwrap_or("redis://localhost:6379");

        let connection_info: FalkorConnectionInfo = uri
            .try_into()
            .map_err(|e: falkordb::FalkorDBError| BackendError::Connection(e.to_string()))?;

        let client = FalkorClientBuilder::new_async()
            .with_connection_info(connection_info)
            .build()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let graph = client.select_graph(graph_name);
        tracing::debug!("Connected to FalkorDB graph '{}'", graph_name);

        Ok(Self {
            graph: Arc::new(Mutex::new(graph)),
            graph_name: graph_name.to_string(),
        })
    }

    /// Get the graph name
    pub fn name(&self) -> &str {
        &self.graph_name
    }

    async fn execute(&self, query: &str) -> BackendResult<Vec<Vec<FalkorValue>>> {
        let mut graph = self.graph.lock().await;

        let result = graph
            .query(query)
            .execute()
            .await
            .map_err(|e| BackendError::Query(e.to_string()))?;

        let rows: Vec<Vec<FalkorValue>> = result.data.collect();
        Ok(rows)
    }

    /// All indexes in the graph as (label, property tuple) pairs
    pub async fn all_indexes(&self) -> BackendResult<Vec<(String, Vec<String>)>> {
        let rows = self
            .execute("CALL db.indexes() YIELD label, properties RETURN label, properties")
            .await?;

        let mut indexes = Vec::new();
        for row in rows {
            let label = extract_string(row.first());
            let properties = extract_string_array(row.get(1));
            if !label.is_empty() {
                indexes.push((label, properties));
            }
        }
        Ok(indexes)
    }

    /// All constraints in the graph as (kind, label, property tuple) triples
    pub async fn all_constraints(&self) -> BackendResult<Vec<(String, String, Vec<String>)>> {
        let rows = self
            .execute(
                "CALL db.constraints() YIELD type, label, properties RETURN type, label, properties",
            )
            .await?;

        let mut constraints = Vec::new();
        for row in rows {
            let kind = extract_string(row.first());
            let label = extract_string(row.get(1));
            let properties = extract_string_array(row.get(2));
            if !label.is_empty() {
                constraints.push((kind, label, properties));
            }
        }
        Ok(constraints)
    }
}

#[async_trait]
impl SchemaBackend for FalkorBackend {
    async fn indexes(&self, label: &str) -> BackendResult<Vec<Vec<String>>> {
        let label = ensure_identifier(label)?;
        Ok(self
            .all_indexes()
            .await?
            .into_iter()
            .filter(|(index_label, _)| index_label == label)
            .map(|(_, properties)| properties)
            .collect())
    }

    async fn create_index(&self, label: &str, property: &str) -> BackendResult<()> {
        let label = ensure_identifier(label)?;
        let property = ensure_identifier(property)?;

        let query = format!("CREATE INDEX FOR (n:{label}) ON (n.{property})");
        self.execute(&query).await?;
        Ok(())
    }

    async fn drop_index(&self, label: &str, property: &str) -> BackendResult<()> {
        let label = ensure_identifier(label)?;
        let property = ensure_identifier(property)?;

        let query = format!("DROP INDEX ON :{label}({property})");
        self.execute(&query).await?;
        Ok(())
    }

    async fn constraint_exists(&self, label: &str, property: &str) -> BackendResult<bool> {
        let label = ensure_identifier(label)?;
        let property = ensure_identifier(property)?;

        Ok(self
            .all_constraints()
            .await?
            .iter()
            .any(|(kind, constraint_label, properties)| {
                kind.eq_ignore_ascii_case("unique")
                    && constraint_label == label
                    && properties.len() == 1
                    && properties[0] == property
            }))
    }

    async fn create_constraint(
        &self,
        label: &str,
        property: &str,
        spec: ConstraintSpec,
    ) -> BackendResult<()> {
        let label = ensure_identifier(label)?;
        let property = ensure_identifier(property)?;

        let query = match spec.kind {
            ConstraintKind::Unique => {
                format!("CREATE CONSTRAINT FOR (n:{label}) REQUIRE n.{property} IS UNIQUE")
            }
        };
        self.execute(&query).await?;
        Ok(())
    }

    async fn drop_constraint(
        &self,
        label: &str,
        property: &str,
        spec: ConstraintSpec,
    ) -> BackendResult<()> {
        let label = ensure_identifier(label)?;
        let property = ensure_identifier(property)?;

        let query = match spec.kind {
            ConstraintKind::Unique => {
                format!("DROP CONSTRAINT FOR (n:{label}) REQUIRE n.{property} IS UNIQUE")
            }
        };
        self.execute(&query).await?;
        Ok(())
    }

    async fn run(&self, query: &str) -> BackendResult<()> {
        self.execute(query).await?;
        Ok(())
    }
}

fn extract_string(val: Option<&FalkorValue>) -> String {
    match val {
        Some(FalkorValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn extract_string_array(val: Option<&FalkorValue>) -> Vec<String> {
    match val {
        Some(FalkorValue::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                FalkorValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
