// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::AppState;
use axum::extract::{Path, Query, State};
use paylane_api::convert::{referral_definition, transaction_definition};
use paylane_api::{ReferralRuleRequest, TransactionRequest};
use paylane_core::ports::Clock;
use paylane_store::StoreBackend;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_rules_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.list_referral_rules().await {
        Ok(rules) => Json(json!({"referral_rules": rules})).into_response(),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCurrency);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/referral-rules", &request_id, started, response).await
}

pub(crate) async fn create_rule_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<ReferralRuleRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match referral_definition(&req) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid referral rule definition",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => match state
                .store
                .insert_referral_rule(definition, state.clock.now())
                .await
            {
                Ok(rule) => {
                    info!(request_id = %request_id, currency = %rule.base_currency, "referral rule created");
                    (StatusCode::CREATED, Json(json!({"referral_rule": rule}))).into_response()
                }
                Err(err) => {
                    let (status, err) = store_error(&err, ApiErrorCode::DuplicateCurrency);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(&state, "/api/referral-rules", &request_id, started, response).await
}

pub(crate) async fn get_rule_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.get_referral_rule(id).await {
        Ok(Some(rule)) => Json(json!({"referral_rule": rule})).into_response(),
        Ok(None) => api_error_response(
            StatusCode::NOT_FOUND,
            error_json(
                ApiErrorCode::NotFound,
                "referral rule not found",
                json!({"id": id}),
            ),
        ),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCurrency);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/referral-rules/{id}", &request_id, started, response).await
}

pub(crate) async fn update_rule_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match parse_body::<ReferralRuleRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match referral_definition(&req) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid referral rule definition",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => match state.store.update_referral_rule(id, definition).await {
                Ok(rule) => {
                    info!(request_id = %request_id, id, "referral rule replaced");
                    Json(json!({"referral_rule": rule})).into_response()
                }
                Err(err) => {
                    let (status, err) = store_error(&err, ApiErrorCode::DuplicateCurrency);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(&state, "/api/referral-rules/{id}", &request_id, started, response).await
}

pub(crate) async fn delete_rule_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.delete_referral_rule(id).await {
        Ok(()) => Json(json!({"deleted": true, "id": id})).into_response(),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCurrency);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/referral-rules/{id}", &request_id, started, response).await
}

pub(crate) async fn create_transaction_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<TransactionRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match transaction_definition(&req) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid transaction",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => match state
                .store
                .insert_transaction(definition, state.clock.now())
                .await
            {
                Ok(txn) => {
                    (StatusCode::CREATED, Json(json!({"transaction": txn}))).into_response()
                }
                Err(err) => {
                    let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(&state, "/api/transactions", &request_id, started, response).await
}

pub(crate) async fn get_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.get_transaction(&id).await {
        Ok(Some(txn)) => Json(json!({"transaction": txn})).into_response(),
        Ok(None) => api_error_response(
            StatusCode::NOT_FOUND,
            error_json(
                ApiErrorCode::TransactionNotFound,
                "transaction not found",
                json!({"id": id}),
            ),
        ),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/transactions/{id}", &request_id, started, response).await
}

pub(crate) async fn list_transactions_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match params.get("user_id").map(String::as_str) {
        None | Some("") => api_error_response(
            StatusCode::BAD_REQUEST,
            ApiError::missing_field("user_id"),
        ),
        Some(user_id) => match state.store.list_transactions_for_user(user_id).await {
            Ok(transactions) => Json(json!({"transactions": transactions})).into_response(),
            Err(err) => {
                let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
                api_error_response(status, err)
            }
        },
    };
    finish(&state, "/api/transactions", &request_id, started, response).await
}
