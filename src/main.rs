mod analysis;
mod catalog;
mod client;
mod config;
mod error;
mod fallback;
mod logger;
mod models;
mod normalize;
mod placement;
mod prompts;
mod recommend;
mod router;
mod storage;
#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use catalog::Catalog;
use client::ExtractionClient;
use config::load_or_init;
use router::{run_router, RouterState};
use storage::init_db;

const KEYRING_SERVICE: &str = "VoxRoom";
const KEYRING_USER: &str = "openrouter";

fn openrouter_key() -> Option<String> {
  if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
    if !key.trim().is_empty() {
      return Some(key);
    }
  }
  match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).and_then(|e| e.get_password()) {
    Ok(key) if !key.trim().is_empty() => Some(key),
    Ok(_) => None,
    Err(err) => {
      warn!("no OpenRouter key in keyring: {err}");
      None
    }
  }
}

fn resolve_in(data_dir: &Path, path: &str) -> PathBuf {
  let path = Path::new(path);
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    data_dir.join(path)
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let data_dir = std::env::var_os("VOXROOM_DATA_DIR")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("data"));
  std::fs::create_dir_all(&data_dir)
    .with_context(|| format!("creating data dir {}", data_dir.display()))?;

  let log_path = std::env::var_os("VOXROOM_LOG_FILE").map(PathBuf::from);
  logger::init(log_path.as_deref())?;

  let config = load_or_init(&data_dir.join("config.json"))?;
  info!(models = config.candidate_models.len(), "VoxRoom starting up");

  let api_key = openrouter_key();
  if api_key.is_none() {
    warn!("OpenRouter key missing; requests without a session token will fail");
  }
  let client = ExtractionClient::new(&config, api_key)?;
  let catalog = Catalog::load(&resolve_in(&data_dir, &config.catalog_path))?;
  if catalog.is_empty() {
    warn!(path = %config.catalog_path, "product catalog is empty; recommendations will not resolve");
  }

  let db = init_db(&data_dir.join("voxroom.sqlite3"))?;
  let db = Arc::new(tokio::sync::Mutex::new(db));

  let listener = std::net::TcpListener::bind(&config.bind_addr)
    .with_context(|| format!("binding {}", config.bind_addr))?;

  let state = RouterState {
    started_at: Instant::now(),
    config,
    client,
    catalog,
    db,
  };
  run_router(listener, state).await
}
