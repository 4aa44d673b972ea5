//! Node persistence helpers
//!
//! Thin create / find-or-create / merge conveniences over the backend's
//! write-query primitive. Properties travel as plain name-to-value maps;
//! there is no object mapping layer.

use crate::backend::{ensure_identifier, BackendResult, SchemaBackend};
use crate::PropertyValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered property map rendered into query text
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Writes nodes through a backend's query primitive
pub struct NodeWriter<B: SchemaBackend> {
    backend: Arc<B>,
}

impl<B: SchemaBackend> NodeWriter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Unconditionally create a node
    pub async fn create(&self, label: &str, props: &PropertyMap) -> BackendResult<()> {
        let query = render_create(label, props)?;
        self.backend.run(&query).await
    }

    /// Match a node on `match_props`, creating it with `on_create` extras
    /// if absent
    pub async fn find_or_create(
        &self,
        label: &str,
        match_props: &PropertyMap,
        on_create: &PropertyMap,
    ) -> BackendResult<()> {
        let query = render_find_or_create(label, match_props, on_create)?;
        self.backend.run(&query).await
    }

    /// Upsert: match or create on `key_props`, then set `props` either way
    pub async fn merge(
        &self,
        label: &str,
        key_props: &PropertyMap,
        props: &PropertyMap,
    ) -> BackendResult<()> {
        let query = render_merge(label, key_props, props)?;
        self.backend.run(&query).await
    }
}

fn render_create(label: &str, props: &PropertyMap) -> BackendResult<String> {
    let label = ensure_identifier(label)?;
    if props.is_empty() {
        return Ok(format!("CREATE (n:{label})"));
    }
    Ok(format!("CREATE (n:{} {})", label, render_map(props)?))
}

fn render_find_or_create(
    label: &str,
    match_props: &PropertyMap,
    on_create: &PropertyMap,
) -> BackendResult<String> {
    let mut query = render_merge_clause(label, match_props)?;
    if !on_create.is_empty() {
        query.push_str("\nON CREATE SET ");
        query.push_str(&render_assignments(on_create)?);
    }
    Ok(query)
}

fn render_merge(
    label: &str,
    key_props: &PropertyMap,
    props: &PropertyMap,
) -> BackendResult<String> {
    let mut query = render_merge_clause(label, key_props)?;
    if !props.is_empty() {
        query.push_str("\nSET ");
        query.push_str(&render_assignments(props)?);
    }
    Ok(query)
}

fn render_merge_clause(label: &str, props: &PropertyMap) -> BackendResult<String> {
    let label = ensure_identifier(label)?;
    if props.is_empty() {
        return Ok(format!("MERGE (n:{label})"));
    }
    Ok(format!("MERGE (n:{} {})", label, render_map(props)?))
}

fn render_map(props: &PropertyMap) -> BackendResult<String> {
    let mut entries = Vec::with_capacity(props.len());
    for (name, value) in props {
        let name = ensure_identifier(name)?;
        entries.push(format!("{}: {}", name, render_value(value)));
    }
    Ok(format!("{{{}}}", entries.join(", ")))
}

fn render_assignments(props: &PropertyMap) -> BackendResult<String> {
    let mut entries = Vec::with_capacity(props.len());
    for (name, value) in props {
        let name = ensure_identifier(name)?;
        entries.push(format!("n.{} = {}", name, render_value(value)));
    }
    Ok(entries.join(", "))
}

fn render_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => format!("'{}'", escape_string(s)),
        PropertyValue::Integer(n) => n.to_string(),
        PropertyValue::Float(f) => format!("{f:?}"),
        PropertyValue::Boolean(b) => b.to_string(),
    }
}

/// Escape a string for use in a Cypher query
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
