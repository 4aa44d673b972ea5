//! Status command implementation

use trellis_core::backend::FalkorBackend;

pub async fn run(format: &str, db_uri: Option<&str>, graph_name: &str) -> anyhow::Result<()> {
    let backend = FalkorBackend::connect(db_uri, graph_name).await?;

    let indexes = backend.all_indexes().await?;
    let constraints = backend.all_constraints().await?;

    if format == "json" {
        let json = serde_json::json!({
            "graph": graph_name,
            "indexes": indexes
                .iter()
                .map(|(label, properties)| {
                    serde_json::json!({"label": label, "properties": properties})
                })
                .collect::<Vec<_>>(),
            "constraints": constraints
                .iter()
                .map(|(kind, label, properties)| {
                    serde_json::json!({"kind": kind, "label": label, "properties": properties})
                })
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Schema status for graph '{}'", graph_name);
    println!("================================\n");

    println!("--- Indexes ---\n");
    if indexes.is_empty() {
        println!("(none)");
    } else {
        println!("{:<24} PROPERTIES", "LABEL");
        println!("{}", "-".repeat(48));
        for (label, properties) in &indexes {
            println!("{:<24} {}", label, properties.join(", "));
        }
        println!("\nTotal: {} index(es)", indexes.len());
    }

    println!("\n--- Constraints ---\n");
    if constraints.is_empty() {
        println!("(none)");
    } else {
        println!("{:<12} {:<24} PROPERTIES", "KIND", "LABEL");
        println!("{}", "-".repeat(60));
        for (kind, label, properties) in &constraints {
            println!("{:<12} {:<24} {}", kind, label, properties.join(", "));
        }
        println!("\nTotal: {} constraint(s)", constraints.len());
    }

    Ok(())
}
