//! bounty-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `BOUNTY_*` environment variables, opens the SQLite store, settles any
//! ledger postings left over from a previous run, and serves the JSON API.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use bounty_lifecycle::Lifecycle;
use bounty_server::ServerConfig;
use bounty_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Bounty board API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("BOUNTY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_allow_origins"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let (identity, ledger) = bounty_clients::connect(&server_cfg.client_config())
    .context("failed to configure collaborator clients")?;

  let engine = Arc::new(
    Lifecycle::new(store, identity, ledger).with_retry(server_cfg.retry_policy()),
  );

  // Anything still pending or claimed was left by a previous process.
  match engine.recover_pending().await {
    Ok(report) if report.failed > 0 => {
      tracing::warn!(
        settled = report.settled,
        failed = report.failed,
        "some pending settlements could not be posted"
      );
    }
    Ok(_) => {}
    Err(e) => tracing::warn!(error = %e, "startup reconciliation failed"),
  }

  let app = bounty_server::app(engine, &server_cfg);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
