//! # Knowbot CLI
//!
//! The `knowbot` binary registers organizations, asks questions against
//! their knowledge indexes, and serves the JSON HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! knowbot --config ./config/knowbot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `knowbot init` | Create the SQLite database and run schema migrations |
//! | `knowbot create manual --file org.json` | Register from structured fields |
//! | `knowbot create auto --name N --file doc.pdf` | Register from a PDF |
//! | `knowbot ask <org-id> "<question>"` | Ask a question |
//! | `knowbot list` | List registered organizations |
//! | `knowbot history <org-id>` | Recent interactions, newest first |
//! | `knowbot serve` | Start the HTTP server |
//!
//! Note that `create` followed by `ask` in separate invocations will report
//! the index as unavailable: indexes live only in process memory, so
//! create-then-ask workflows belong in one `serve` process.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use knowbot::config;
use knowbot::ingest::{self, CreateOrganization};
use knowbot::models::{IngestSource, ManualPayload};
use knowbot::registry::IndexRegistry;
use knowbot::{db, migrate, query, server, store};

/// Knowbot — per-organization knowledge indexing and retrieval-augmented
/// question answering.
#[derive(Parser)]
#[command(
    name = "knowbot",
    about = "Per-organization knowledge indexing and retrieval-augmented question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/knowbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the organizations and
    /// interactions tables. Idempotent.
    Init,

    /// Register a new organization and build its knowledge index.
    Create {
        #[command(subcommand)]
        mode: CreateMode,
    },

    /// Ask a question against an organization's knowledge index.
    Ask {
        /// Organization id.
        org_id: String,
        /// The question text.
        question: String,
    },

    /// List registered organizations.
    List,

    /// Show recent interactions for an organization, newest first.
    History {
        /// Organization id.
        org_id: String,
        /// Maximum number of interactions to show (capped at 50).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Start the JSON HTTP server.
    Serve,
}

#[derive(Subcommand)]
enum CreateMode {
    /// Register from a structured description file.
    ///
    /// The JSON file carries the organization name, description, and the
    /// manual fields (website, industry, about, employees, products,
    /// services).
    Manual {
        /// Path to the JSON description file.
        #[arg(long)]
        file: PathBuf,
    },
    /// Register from an uploaded PDF document.
    Auto {
        /// Organization display name.
        #[arg(long)]
        name: String,
        /// Organization description.
        #[arg(long, default_value = "")]
        description: String,
        /// Path to the PDF document.
        #[arg(long)]
        file: PathBuf,
    },
}

/// On-disk shape of a `create manual` description file.
#[derive(Deserialize)]
struct ManualManifest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    payload: ManualPayload,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Create { mode } => {
            let request = match mode {
                CreateMode::Manual { file } => {
                    let content = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let manifest: ManualManifest = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse {}", file.display()))?;
                    CreateOrganization {
                        name: manifest.name,
                        description: manifest.description,
                        source: IngestSource::Manual(manifest.payload),
                    }
                }
                CreateMode::Auto {
                    name,
                    description,
                    file,
                } => {
                    let bytes = std::fs::read(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let filename = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "document.pdf".to_string());
                    CreateOrganization {
                        name,
                        description,
                        source: IngestSource::Automatic { filename, bytes },
                    }
                }
            };

            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let registry = IndexRegistry::new();

            let org = ingest::create_organization(&cfg, &pool, &registry, request).await?;
            println!("created organization");
            println!("  id: {}", org.org_id);
            println!("  name: {}", org.name);
            println!("  mode: {}", org.payload.mode());
            pool.close().await;
        }
        Commands::Ask { org_id, question } => {
            let pool = db::connect(&cfg.db.path).await?;
            let registry = IndexRegistry::new();

            let answer = query::answer(&cfg, &pool, &registry, &org_id, &question).await?;
            println!("{}", answer.answer);
            println!("  answered: {}", answer.created_at.to_rfc3339());
            pool.close().await;
        }
        Commands::List => {
            let pool = db::connect(&cfg.db.path).await?;
            let orgs = store::list_organizations(&pool).await?;
            if orgs.is_empty() {
                println!("No organizations.");
            }
            for org in orgs {
                println!(
                    "{}  {} ({}, created {})",
                    org.org_id,
                    org.name,
                    org.payload.mode(),
                    org.created_at.format("%Y-%m-%d")
                );
            }
            pool.close().await;
        }
        Commands::History { org_id, limit } => {
            let pool = db::connect(&cfg.db.path).await?;
            let limit = limit
                .unwrap_or(store::RECENT_HISTORY_LIMIT)
                .clamp(1, store::RECENT_HISTORY_LIMIT);
            let records = store::list_recent_interactions(&pool, &org_id, limit).await?;
            if records.is_empty() {
                println!("No interactions.");
            }
            for record in records {
                println!("[{}] Q: {}", record.created_at.to_rfc3339(), record.question);
                println!("    A: {}", record.answer);
            }
            pool.close().await;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
