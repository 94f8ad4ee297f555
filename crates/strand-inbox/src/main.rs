//! strand-inbox server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `STRAND_*` environment variables, opens an in-process SQLite store, makes
//! sure the local user exists, and serves the inbox over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use strand_core::{
  person::{NewPerson, normalize_handle},
  store::FederationStore,
};
use strand_federation::Dispatcher;
use strand_inbox::{AppState, ServerConfig};
use strand_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Strand federation inbox")]
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
    .add_source(config::Environment::with_prefix("STRAND"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let local_handle = normalize_handle(&server_cfg.local_handle)
    .with_context(|| format!("invalid local_handle {:?}", server_cfg.local_handle))?;
  let local = store
    .create_person(NewPerson::new(local_handle))
    .await
    .context("failed to create the local user")?;
  tracing::info!(handle = %local.handle, guid = %local.guid, "serving inbox");

  let state = AppState {
    dispatcher: Arc::new(Dispatcher::with_store(
      Arc::new(store),
      server_cfg.dispatch_config(),
    )),
    config:     Arc::new(server_cfg.clone()),
  };

  let app = strand_inbox::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

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
