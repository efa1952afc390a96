use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mien_core::types::{Embedding, EMBEDDING_DIM};
use mien_store::record::decode_canonical;
use mien_store::{Config, DocumentStore, EmbeddingStore, RawStoredValue, SqliteStore};

#[derive(Parser)]
#[command(name = "mien", about = "Mien face store maintenance")]
struct Cli {
    /// Database path (default: $MIEN_DB_PATH, then the user data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered faces and their stored encodings
    List,
    /// Show one record as JSON
    Show {
        /// Registered name
        name: String,
    },
    /// Import a canonical embedding from a JSON float array
    Import {
        /// Name to register (must be unused)
        name: String,
        /// Path to a JSON file containing an array of floats
        file: PathBuf,
    },
    /// Remove a registered face
    Remove {
        /// Registered name
        name: String,
    },
    /// Summarize the store as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());
    let store = SqliteStore::open(&db_path)
        .await
        .with_context(|| format!("opening store at {}", db_path.display()))?;

    match cli.command {
        Commands::List => {
            let docs = store.fetch_all().await?;
            if docs.is_empty() {
                println!("no registered faces");
                return Ok(());
            }
            for doc in docs {
                let registered = doc.registered_at.as_deref().unwrap_or("-");
                println!("{:<24} {:<28} {}", doc.name, describe(&doc.value), registered);
            }
        }
        Commands::Show { name } => {
            let Some(value) = store.fetch_one(&name).await? else {
                anyhow::bail!("no record named {name:?}");
            };
            let detail = match &value {
                RawStoredValue::Binary(bytes) => match decode_canonical(bytes) {
                    Some(embedding) => serde_json::json!({
                        "name": name,
                        "encoding": "canonical",
                        "dim": embedding.dim(),
                        "values": embedding.values,
                    }),
                    None => serde_json::json!({
                        "name": name,
                        "encoding": "legacy-image",
                        "bytes": bytes.len(),
                    }),
                },
                RawStoredValue::Text(text) => serde_json::json!({
                    "name": name,
                    "encoding": "legacy-base64",
                    "chars": text.len(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Commands::Import { name, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let values: Vec<f32> =
                serde_json::from_str(&raw).context("expected a JSON array of floats")?;
            if values.len() != EMBEDDING_DIM {
                tracing::warn!(
                    dim = values.len(),
                    expected = EMBEDDING_DIM,
                    "embedding dimension differs from the library default"
                );
            }
            let adapter = EmbeddingStore::new(store);
            adapter.register(&name, &Embedding::new(values)).await?;
            println!("registered {name}");
        }
        Commands::Remove { name } => {
            if store.remove(&name).await? {
                println!("removed {name}");
            } else {
                println!("no record named {name}");
            }
        }
        Commands::Status => {
            let docs = store.fetch_all().await?;
            let canonical = docs
                .iter()
                .filter(|d| matches!(&d.value, RawStoredValue::Binary(b) if decode_canonical(b).is_some()))
                .count();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "db": db_path.display().to_string(),
                    "registered": docs.len(),
                    "canonical": canonical,
                    "legacy": docs.len() - canonical,
                    "tolerance": config.tolerance,
                    "refresh_secs": config.refresh_period.as_secs(),
                }))?
            );
        }
    }

    Ok(())
}

/// One-line encoding summary for `list`.
fn describe(value: &RawStoredValue) -> String {
    match value {
        RawStoredValue::Binary(bytes) => match decode_canonical(bytes) {
            Some(embedding) => format!("canonical ({} dims)", embedding.dim()),
            None => format!("legacy image ({} bytes)", bytes.len()),
        },
        RawStoredValue::Text(text) => format!("legacy base64 ({} chars)", text.len()),
    }
}
