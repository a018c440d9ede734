//! tenet policy server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), overlays
//! `TENET_`-prefixed environment variables (`TENET_PORT=9000`,
//! `TENET_DB__DATABASE=/var/lib/tenet.db`), opens the SQLite store and serves
//! the JSON API over HTTP.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tenet_api::PolicyService;
use tenet_store_sqlite::{DatabaseConfig, SqliteStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tenet policy server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "TENET_CONFIG", default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerConfig {
  host: String,
  port: u16,
  db:   DatabaseConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".into(),
      port: 8080,
      db:   DatabaseConfig::default(),
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TENET").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  tracing::debug!(?server_cfg, "loaded configuration");

  // Open SQLite store; migrations run or are verified per `db.run_migrations`.
  let store = SqliteStore::open_with_config(&server_cfg.db)
    .await
    .with_context(|| format!("failed to open store {:?}", server_cfg.db.database))?;

  let app = tenet_api::router(PolicyService::new(store))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
