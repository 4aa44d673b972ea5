//! Check command implementation
//!
//! Dry run: reports which declared schema objects are missing or
//! conflicting without writing anything.

use std::path::Path;
use trellis_core::backend::{constraint_exists, FalkorBackend, LabelHandle};
use trellis_core::manifest::SchemaManifest;

pub async fn run(
    manifest_path: &str,
    db_uri: Option<&str>,
    graph_name: &str,
) -> anyhow::Result<()> {
    let manifest = SchemaManifest::load(Path::new(manifest_path))?;
    let backend = FalkorBackend::connect(db_uri, graph_name).await?;

    println!("Checking graph '{}' against {}\n", graph_name, manifest_path);

    let mut missing = 0;

    for model in &manifest.models {
        println!("{}:", model.name);
        let def = model.to_def();

        for property in &model.indexes {
            for label in def.mapped_labels() {
                let handle = LabelHandle::resolve(&backend, label);
                if handle.has_index(property).await? {
                    println!("  index {} on :{:<24} present", property, label);
                } else if constraint_exists(&backend, label, property).await? {
                    println!(
                        "  index {} on :{:<24} conflicting (unique constraint present)",
                        property, label
                    );
                    missing += 1;
                } else {
                    println!("  index {} on :{:<24} missing", property, label);
                    missing += 1;
                }
            }
        }

        for constraint in &model.constraints {
            let label = def.primary_label();
            let property = constraint.property.as_str();
            if constraint_exists(&backend, label, property).await? {
                println!("  {} constraint {} on :{:<12} present", constraint.kind, property, label);
            } else if LabelHandle::resolve(&backend, label)
                .has_index(property)
                .await?
            {
                println!(
                    "  {} constraint {} on :{:<12} conflicting (plain index present)",
                    constraint.kind, property, label
                );
                missing += 1;
            } else {
                println!("  {} constraint {} on :{:<12} missing", constraint.kind, property, label);
                missing += 1;
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{} schema object(s) out of sync", missing);
    }

    println!("\nSchema is up to date");
    Ok(())
}
