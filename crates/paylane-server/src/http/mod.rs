// SPDX-License-Identifier: Apache-2.0

use crate::AppState;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use paylane_api::{ApiError, ApiErrorCode};
use paylane_rules::{BonusRejection, CreditError, PromoError, PromoRejection};
use paylane_store::StoreError;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::time::Duration;

pub(crate) mod credits;
pub(crate) mod handlers;
pub(crate) mod promos;
pub(crate) mod referrals;

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    (status, Json(json!({"error": err}))).into_response()
}

/// Records the request in the metrics registry and stamps the response with
/// the request id. Every handler funnels its response through here.
pub(crate) async fn finish(
    state: &AppState,
    route: &'static str,
    request_id: &str,
    started: std::time::Instant,
    response: Response,
) -> Response {
    state
        .metrics
        .observe_request(
            route,
            response.status(),
            started.elapsed(),
            state.api.slow_request_threshold,
        )
        .await;
    with_request_id(response, request_id)
}

pub(crate) fn error_json(code: ApiErrorCode, message: &str, details: Value) -> ApiError {
    ApiError::new(code, message, details)
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .map(std::string::ToString::to_string)
}

pub(crate) fn put_cache_headers(headers: &mut HeaderMap, ttl: Duration, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert("cache-control", value);
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert("etag", value);
    }
}

/// Shapes body decode failures into the API error contract instead of the
/// extractor's plain-text default.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::validation_failed(format!("invalid request body: {e}")))
}

pub(crate) fn store_error(err: &StoreError, conflict_code: ApiErrorCode) -> (StatusCode, ApiError) {
    match err {
        StoreError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            error_json(ApiErrorCode::NotFound, &format!("{what} not found"), json!({})),
        ),
        StoreError::Conflict(message) => (
            StatusCode::CONFLICT,
            error_json(conflict_code, message, json!({})),
        ),
        StoreError::Backend(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(ApiErrorCode::Internal, message, json!({})),
        ),
        _ => unreachable!("unhandled StoreError variant"),
    }
}

fn promo_rejection_code(rejection: PromoRejection) -> ApiErrorCode {
    match rejection {
        PromoRejection::NotFound => ApiErrorCode::PromoNotFound,
        PromoRejection::ExpiredOrInactive => ApiErrorCode::PromoExpiredOrInactive,
        PromoRejection::UsageCapReached => ApiErrorCode::UsageCapReached,
        PromoRejection::BudgetCapReached => ApiErrorCode::BudgetCapReached,
        PromoRejection::BelowThreshold => ApiErrorCode::BelowMinThreshold,
        PromoRejection::CorridorNotAllowed => ApiErrorCode::CorridorNotAllowed,
        PromoRejection::MethodNotAllowed => ApiErrorCode::MethodNotAllowed,
        PromoRejection::PerUserCapReached => ApiErrorCode::PerUserCapReached,
        PromoRejection::AffiliateNotAllowed => ApiErrorCode::AffiliateNotAllowed,
        _ => ApiErrorCode::ValidationFailed,
    }
}

pub(crate) fn promo_error(err: &PromoError) -> (StatusCode, ApiError) {
    match err {
        PromoError::Rejected(rejection) => {
            let status = if *rejection == PromoRejection::NotFound {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            (
                status,
                error_json(
                    promo_rejection_code(*rejection),
                    rejection.message(),
                    json!({}),
                ),
            )
        }
        PromoError::Store(store) => store_error(store, ApiErrorCode::DuplicateCode),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::internal("unexpected promo failure"),
        ),
    }
}

fn bonus_rejection_code(rejection: BonusRejection) -> ApiErrorCode {
    match rejection {
        BonusRejection::SchemeNotFound => ApiErrorCode::SchemeNotFound,
        BonusRejection::SchemeExpired => ApiErrorCode::SchemeExpired,
        BonusRejection::SchemeInactive => ApiErrorCode::SchemeInactive,
        BonusRejection::AlreadyEarned => ApiErrorCode::AlreadyEarned,
        BonusRejection::TierMismatch => ApiErrorCode::TierMismatch,
        BonusRejection::TransactionRequired => ApiErrorCode::TransactionRequired,
        BonusRejection::TransactionNotFound => ApiErrorCode::TransactionNotFound,
        _ => ApiErrorCode::ValidationFailed,
    }
}

pub(crate) fn credit_error(err: &CreditError) -> (StatusCode, ApiError) {
    match err {
        CreditError::Rejected(rejection) => {
            let status = match rejection {
                BonusRejection::SchemeNotFound | BonusRejection::TransactionNotFound => {
                    StatusCode::NOT_FOUND
                }
                BonusRejection::AlreadyEarned => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            (
                status,
                error_json(
                    bonus_rejection_code(*rejection),
                    rejection.message(),
                    json!({}),
                ),
            )
        }
        CreditError::Invalid(validation) => (
            StatusCode::BAD_REQUEST,
            ApiError::validation_failed(validation.0.clone()),
        ),
        CreditError::Store(store) => store_error(store, ApiErrorCode::DuplicateCurrency),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::internal("unexpected credit failure"),
        ),
    }
}
