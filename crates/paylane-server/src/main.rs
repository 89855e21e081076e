// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use paylane_core::ports::SystemClock;
use paylane_core::{ExitCode, ENV_PAYLANE_DB_PATH, ENV_PAYLANE_LOG_LEVEL};
use paylane_server::{build_router, ApiConfig, AppState};
use paylane_store::SqliteBackend;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env(ENV_PAYLANE_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_path = PathBuf::from(env_string(ENV_PAYLANE_DB_PATH, "paylane.db"));
    let store = match SqliteBackend::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(db = %db_path.display(), %err, "failed to open store");
            std::process::exit(ExitCode::DependencyFailure as i32);
        }
    };

    let api = ApiConfig {
        default_currency: env_string("PAYLANE_DEFAULT_CURRENCY", "USD"),
        max_body_bytes: env_usize("PAYLANE_MAX_BODY_BYTES", 64 * 1024),
        discovery_ttl: env_duration_ms("PAYLANE_DISCOVERY_TTL_MS", 30_000),
        slow_request_threshold: env_duration_ms("PAYLANE_SLOW_REQUEST_MS", 200),
    };
    let state = AppState::with_config(store, api, Arc::new(SystemClock));
    let app = build_router(state);

    let bind = env_string("PAYLANE_BIND", "0.0.0.0:8080");
    let listener = match TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%bind, %err, "failed to bind");
            std::process::exit(ExitCode::DependencyFailure as i32);
        }
    };
    info!(%bind, db = %db_path.display(), "paylane server listening");

    if let Err(err) = axum::serve(listener, app).await {
        error!(%err, "server terminated");
        std::process::exit(ExitCode::Internal as i32);
    }
}
