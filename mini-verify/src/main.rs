//! mini-verify - Resolve and inspect the minifeed publisher identity
//!
//! Resolves the GCID for the configured feed key, persisting it into the
//! configuration so subsequent runs (and the bridge itself) skip the
//! network. `--reset` clears the persisted value, which is the only way
//! to force re-resolution.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use libminicast::{config, identity, MinifeedClient, NoticeSink, Result, Settings, SqliteKvStore};

#[derive(Parser, Debug)]
#[command(name = "mini-verify")]
#[command(version)]
#[command(about = "Resolve the minifeed publisher identity (GCID)")]
#[command(long_about = "\
mini-verify - Resolve the minifeed publisher identity (GCID)

DESCRIPTION:
    Resolves the GCID assigned to this installation's feed key via the
    minifeed API and persists it into the configuration file. Once
    persisted, the identity is never re-derived automatically; use
    --reset to clear it and resolve again.

USAGE EXAMPLES:
    # Resolve (or print the already-persisted) identity
    mini-verify

    # Force re-resolution on the next run
    mini-verify --reset

CONFIGURATION:
    Configuration file: ~/.config/minicast/config.toml
    State database:     ~/.local/share/minicast/state.db

    Override with environment variables:
        MINICAST_CONFIG - Path to config file

EXIT CODES:
    0 - Success
    1 - No identity available, or configuration/store error
    3 - Invalid input
")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clear the persisted GCID so the next run re-resolves it
    #[arg(long)]
    reset: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
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
        libminicast::logging::init_default();
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
    let mut settings = Settings::load_from_path(&config_path)?;

    if cli.reset {
        if identity::reset_identity(&mut settings) {
            settings.save_to_path(&config_path)?;
            println!("Cleared persisted GCID; the next run will re-resolve it.");
        } else {
            println!("No persisted GCID to clear.");
        }
        return Ok(());
    }

    let store = Arc::new(SqliteKvStore::new(&settings.store.path).await?);
    let notices = NoticeSink::new(store);
    let client = MinifeedClient::new(
        settings.api.base_url.clone(),
        settings.api.feedkey.clone(),
        notices.clone(),
    );

    let had_gcid = settings.api.gcid.is_some();
    match identity::resolve_identity(&mut settings, &client).await {
        Some(gcid) => {
            if !had_gcid {
                settings.save_to_path(&config_path)?;
                tracing::info!("Persisted newly resolved GCID into configuration");
            }
            println!("{}", gcid);
            Ok(())
        }
        None => {
            for line in notices.flush().await {
                eprintln!("{}", line);
            }
            eprintln!("No identity available; configure a feed key and check connectivity.");
            std::process::exit(1);
        }
    }
}
