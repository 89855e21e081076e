// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::config::CONFIG_SCHEMA_VERSION;
use crate::AppState;
use axum::extract::State;
use axum::http::header;
use paylane_store::StoreBackend;
use serde_json::json;
use std::time::Instant;

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = (StatusCode::OK, "ok").into_response();
    finish(&state, "/healthz", &request_id, started, response).await
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    // readiness means the store answers a cheap query
    let response = match state.store.list_referral_rules().await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response(),
    };
    finish(&state, "/readyz", &request_id, started, response).await
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let payload = json!({
        "server": {
            "crate": crate::CRATE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "config_schema_version": CONFIG_SCHEMA_VERSION,
            "store_backend": state.store.backend_tag(),
        }
    });
    let response = Json(payload).into_response();
    finish(&state, "/v1/version", &request_id, started, response).await
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let body = state.metrics.render_text().await;
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    finish(&state, "/metrics", &request_id, started, response).await
}
