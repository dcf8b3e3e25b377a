//! HTTP server wiring for Folio: configuration, the traced application
//! router, and demo data.

pub mod seed;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use folio_core::{service::Discussions, store::DiscussionStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `FOLIO_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing applied.
pub fn app<S>(discussions: Arc<Discussions<S>>) -> Router
where
  S: DiscussionStore + 'static,
{
  folio_api::api_router(discussions).layer(TraceLayer::new_for_http())
}
