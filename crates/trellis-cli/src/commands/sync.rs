//! Sync command implementation

use std::path::Path;
use std::sync::Arc;
use trellis_core::backend::FalkorBackend;
use trellis_core::manifest::SchemaManifest;
use trellis_core::sync::ModelSchema;

pub async fn run(
    manifest_path: &str,
    db_uri: Option<&str>,
    graph_name: &str,
) -> anyhow::Result<()> {
    let manifest = SchemaManifest::load(Path::new(manifest_path))?;
    tracing::debug!("Loaded manifest from {}", manifest_path);
    println!(
        "Syncing {} model(s) to graph '{}'",
        manifest.models.len(),
        graph_name
    );

    let backend = Arc::new(FalkorBackend::connect(db_uri, graph_name).await?);
    let mut failures = 0;

    for model in &manifest.models {
        println!("\n{}:", model.name);
        let schema = ModelSchema::new(model.to_def());

        // Queue every directive before the gate opens so they execute in
        // declaration order.
        let mut handles = Vec::new();
        for property in &model.indexes {
            let handle = schema.index(property).await;
            handles.push((format!("index {}", property), handle));
        }
        for constraint in &model.constraints {
            let handle = schema
                .constraint(&constraint.property, constraint.spec())
                .await;
            handles.push((
                format!("{} constraint {}", constraint.kind, constraint.property),
                handle,
            ));
        }

        schema.open(Arc::clone(&backend)).await;

        for (description, handle) in handles {
            match handle.wait().await {
                Ok(()) => println!("  {:<40} ok", description),
                Err(e) => {
                    println!("  {:<40} failed: {}", description, e);
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} schema operation(s) failed", failures);
    }

    println!("\nSync complete");
    Ok(())
}
