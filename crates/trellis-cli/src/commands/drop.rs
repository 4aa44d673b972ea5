//! Drop command implementation
//!
//! Removes every schema object a manifest declares. Indexes are dropped
//! from each mapped label; constraints from the primary label.

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
    println!(
        "Dropping declared schema for {} model(s) from graph '{}'",
        manifest.models.len(),
        graph_name
    );

    let backend = Arc::new(FalkorBackend::connect(db_uri, graph_name).await?);
    let mut failures = 0;

    for model in &manifest.models {
        println!("\n{}:", model.name);
        let schema = ModelSchema::new(model.to_def());
        let labels: Vec<String> = schema
            .def()
            .mapped_labels()
            .into_iter()
            .map(String::from)
            .collect();

        let mut handles = Vec::new();
        for constraint in &model.constraints {
            let handle = schema
                .drop_constraint(&constraint.property, Some(constraint.spec()))
                .await;
            handles.push((
                format!("drop {} constraint {}", constraint.kind, constraint.property),
                handle,
            ));
        }
        for property in &model.indexes {
            for label in &labels {
                let handle = schema.drop_index(property, Some(label.as_str())).await;
                handles.push((format!("drop index {} on :{}", property, label), handle));
            }
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

    println!("\nDrop complete");
    Ok(())
}
