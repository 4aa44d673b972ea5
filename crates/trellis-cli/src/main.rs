//! Trellis CLI - Graph schema synchronization tool
//!
//! Applies declared model schemas (indexes and unique constraints) to a
//! FalkorDB graph.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "A schema synchronization tool for graph databases")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// FalkorDB connection URI (default: redis://localhost:6379)
    #[arg(long, global = true, env = "TRELLIS_DB_URI")]
    db_uri: Option<String>,

    /// Graph name (default: trellis)
    #[arg(long, global = true, default_value = "trellis")]
    graph: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a schema manifest to the graph
    Sync {
        /// Path to the JSON schema manifest
        manifest: String,
    },

    /// Report which declared schema objects are missing, without writing
    Check {
        /// Path to the JSON schema manifest
        manifest: String,
    },

    /// Show live indexes and constraints
    Status {
        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Drop every schema object a manifest declares
    Drop {
        /// Path to the JSON schema manifest
        manifest: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match cli.command {
        Commands::Sync { manifest } => {
            commands::sync::run(&manifest, cli.db_uri.as_deref(), &cli.graph).await
        }
        Commands::Check { manifest } => {
            commands::check::run(&manifest, cli.db_uri.as_deref(), &cli.graph).await
        }
        Commands::Status { format } => {
            commands::status::run(&format, cli.db_uri.as_deref(), &cli.graph).await
        }
        Commands::Drop { manifest } => {
            commands::drop::run(&manifest, cli.db_uri.as_deref(), &cli.graph).await
        }
    }
}
