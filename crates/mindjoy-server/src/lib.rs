//! Wiring for the Mindjoy HTTP server: configuration, system habit seeding,
//! and the traced router. The binary in `main.rs` only parses arguments and
//! binds the listener.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use mindjoy_core::{Mindjoy, clock::Clock, habit::SystemHabit, store::RecordStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MINDJOY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub store_path:       PathBuf,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms: u64,
  /// Titles of the shared habit catalogue, seeded at startup.
  #[serde(default)]
  pub system_habits:    Vec<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_timeout_ms() -> u64 { 5_000 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_timeout(&self) -> Duration { Duration::from_millis(self.store_timeout_ms) }
}

// ─── Startup ─────────────────────────────────────────────────────────────────

/// Make sure every configured system habit exists. Safe to run on every boot;
/// existing titles are left alone.
pub async fn seed_system_habits<S, C>(
  app: &Mindjoy<S, C>,
  titles: &[String],
) -> mindjoy_core::Result<Vec<SystemHabit>>
where
  S: RecordStore,
  C: Clock,
{
  let mut seeded = Vec::with_capacity(titles.len());
  for title in titles {
    let title = title.trim();
    if title.is_empty() {
      continue;
    }
    let habit = app
      .store()
      .add_system_habit(title.to_owned())
      .await
      .map_err(mindjoy_core::Error::store)?;
    seeded.push(habit);
  }
  info!(count = seeded.len(), "system habits ready");
  Ok(seeded)
}

/// The API router with request tracing applied.
pub fn router<S, C>(app: Arc<Mindjoy<S, C>>) -> Router
where
  S: RecordStore + 'static,
  C: Clock + 'static,
{
  mindjoy_api::api_router(app).layer(TraceLayer::new_for_http())
}
