//! mini-queue - Inspect the pending publish queue
//!
//! Unix-style tool for looking at (and pruning) the durable retry buffer
//! of not-yet-confirmed minifeed publications. Sending itself happens in
//! the bridge's save pipeline; this tool only inspects and removes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use libminicast::queue::{PublishPayload, PublishQueue};
use libminicast::{config, MinicastError, Result, Settings, SqliteKvStore};

#[derive(Parser, Debug)]
#[command(name = "mini-queue")]
#[command(version)]
#[command(about = "Inspect pending minifeed publications")]
#[command(long_about = "\
mini-queue - Inspect pending minifeed publications

DESCRIPTION:
    mini-queue lists and prunes the publish queue: content items whose
    publication to the minifeed has not yet been confirmed. Entries are
    retried automatically on the next save event in the host CMS; remove
    an entry only if it should never be published.

COMMANDS:
    list     List queued publications
    remove   Remove a single queued entry
    clear    Remove every queued entry
    stats    Show queue statistics

USAGE EXAMPLES:
    # List pending publications
    mini-queue list

    # List in JSON format
    mini-queue list --format json

    # Drop the entry for content item 42
    mini-queue remove 42

    # Drop everything (requires --force)
    mini-queue clear --force

CONFIGURATION:
    Configuration file: ~/.config/minicast/config.toml
    State database:     ~/.local/share/minicast/state.db

    Override with environment variables:
        MINICAST_CONFIG - Path to config file

EXIT CODES:
    0 - Success
    1 - Configuration or store error
    3 - Invalid input (unknown item id, missing --force)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List queued publications
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove a single queued entry
    Remove {
        /// Content-item identifier to remove
        item_id: String,
    },

    /// Remove every queued entry
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::resolve_config_path()?,
    };
    let settings = Settings::load_from_path(&config_path)?;

    let store = Arc::new(SqliteKvStore::new(&settings.store.path).await?);
    let mut queue = PublishQueue::load(store).await;

    match cli.command {
        Commands::List { format } => list(&queue, &format),
        Commands::Remove { item_id } => {
            if !queue.remove(&item_id) {
                return Err(MinicastError::InvalidInput(format!(
                    "No queued entry for item {}",
                    item_id
                )));
            }
            queue.persist().await?;
            println!("Removed queued entry for item {}.", item_id);
            Ok(())
        }
        Commands::Clear { force } => {
            if !force {
                return Err(MinicastError::InvalidInput(
                    "Refusing to clear the queue without --force".to_string(),
                ));
            }
            let dropped = queue.len();
            queue.clear();
            queue.persist().await?;
            println!("Cleared {} queued entr{}.", dropped, if dropped == 1 { "y" } else { "ies" });
            Ok(())
        }
        Commands::Stats { format } => stats(&queue, &format),
    }
}

fn list(queue: &PublishQueue, format: &str) -> Result<()> {
    match format {
        "json" => {
            let entries: Vec<serde_json::Value> = queue
                .entries()
                .iter()
                .map(|entry| {
                    let payload: Option<PublishPayload> = serde_json::from_str(&entry.body).ok();
                    serde_json::json!({
                        "item_id": entry.item_id,
                        "payload": payload,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_default());
        }
        "text" => {
            if queue.is_empty() {
                println!("No pending publications.");
                return Ok(());
            }
            for entry in queue.entries() {
                match serde_json::from_str::<PublishPayload>(&entry.body) {
                    Ok(payload) => {
                        let media = payload
                            .media
                            .as_ref()
                            .map(|m| m.len())
                            .unwrap_or(0);
                        println!(
                            "{}\t{}\t{} media attachment{}",
                            entry.item_id,
                            payload.title,
                            media,
                            if media == 1 { "" } else { "s" }
                        );
                    }
                    Err(_) => println!("{}\t<unparseable payload>", entry.item_id),
                }
            }
        }
        other => {
            return Err(MinicastError::InvalidInput(format!(
                "Unknown format '{}'. Valid options: text, json",
                other
            )));
        }
    }
    Ok(())
}

fn stats(queue: &PublishQueue, format: &str) -> Result<()> {
    let pending = queue.len();
    let with_media = queue
        .entries()
        .iter()
        .filter_map(|e| serde_json::from_str::<PublishPayload>(&e.body).ok())
        .filter(|p| p.media.is_some())
        .count();
    let total_bytes: usize = queue.entries().iter().map(|e| e.body.len()).sum();

    match format {
        "json" => {
            println!(
                "{}",
                serde_json::json!({
                    "pending": pending,
                    "with_media": with_media,
                    "payload_bytes": total_bytes,
                })
            );
        }
        "text" => {
            println!("Pending publications: {}", pending);
            println!("Entries with media:   {}", with_media);
            println!("Payload bytes:        {}", total_bytes);
        }
        other => {
            return Err(MinicastError::InvalidInput(format!(
                "Unknown format '{}'. Valid options: text, json",
                other
            )));
        }
    }
    Ok(())
}
