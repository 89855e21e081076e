// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::AppState;
use axum::extract::{Path, Query, State};
use paylane_api::convert::scheme_definition;
use paylane_api::params::{parse_datetime, parse_range_end};
use paylane_api::{AwardBonusRequest, ManualAdjustRequest, SchemeRequest};
use paylane_core::ports::Clock;
use paylane_model::EntryType;
use paylane_rules::ManualAdjustment;
use paylane_store::{LedgerFilter, StoreBackend};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_schemes_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.list_schemes().await {
        Ok(schemes) => Json(json!({"bonus_schemes": schemes})).into_response(),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/bonus-schemes", &request_id, started, response).await
}

pub(crate) async fn create_scheme_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<SchemeRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match scheme_definition(&req, &state.api.default_currency) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid bonus scheme definition",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => match state
                .store
                .insert_scheme(definition, state.clock.now())
                .await
            {
                Ok(scheme) => {
                    info!(request_id = %request_id, id = scheme.id, name = %scheme.name, "bonus scheme created");
                    (StatusCode::CREATED, Json(json!({"bonus_scheme": scheme}))).into_response()
                }
                Err(err) => {
                    let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(&state, "/api/bonus-schemes", &request_id, started, response).await
}

pub(crate) async fn get_scheme_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.get_scheme(id).await {
        Ok(Some(scheme)) => Json(json!({"bonus_scheme": scheme})).into_response(),
        Ok(None) => api_error_response(
            StatusCode::NOT_FOUND,
            error_json(
                ApiErrorCode::SchemeNotFound,
                "bonus scheme not found",
                json!({"id": id}),
            ),
        ),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/bonus-schemes/{id}", &request_id, started, response).await
}

pub(crate) async fn update_scheme_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match parse_body::<SchemeRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match scheme_definition(&req, &state.api.default_currency) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid bonus scheme definition",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => match state.store.update_scheme(id, definition).await {
                Ok(scheme) => {
                    info!(request_id = %request_id, id, "bonus scheme replaced");
                    Json(json!({"bonus_scheme": scheme})).into_response()
                }
                Err(err) => {
                    let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(&state, "/api/bonus-schemes/{id}", &request_id, started, response).await
}

pub(crate) async fn delete_scheme_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.delete_scheme(id).await {
        Ok(()) => Json(json!({"deleted": true, "id": id})).into_response(),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::ValidationFailed);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/bonus-schemes/{id}", &request_id, started, response).await
}

pub(crate) async fn award_bonus_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<AwardBonusRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => {
            match state
                .credit
                .award_bonus(
                    &req.user_id,
                    req.scheme_id,
                    req.transaction_id.as_deref(),
                    req.admin_user.as_deref(),
                )
                .await
            {
                Ok(awarded) => {
                    info!(
                        request_id = %request_id,
                        user_id = %req.user_id,
                        scheme_id = req.scheme_id,
                        amount = %awarded.amount,
                        "bonus credit awarded"
                    );
                    Json(json!({
                        "awarded": true,
                        "entry_id": awarded.entry.id,
                        "amount": awarded.amount,
                        "currency": awarded.currency,
                        "expires_at": awarded.expires_at,
                    }))
                    .into_response()
                }
                Err(err) => {
                    let (status, err) = credit_error(&err);
                    api_error_response(status, err)
                }
            }
        }
    };
    finish(
        &state,
        "/api/credits/award-bonus",
        &request_id,
        started,
        response,
    )
    .await
}

pub(crate) async fn manual_adjust_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<ManualAdjustRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => {
            let adjustment = ManualAdjustment {
                user_id: req.user_id,
                amount: req.amount,
                entry_type: req.entry_type,
                reason_code: req.reason_code,
                notes: req.notes.unwrap_or_default(),
                scheme_id: req.scheme_id,
                admin_user: req.admin_user,
                idempotency_key: req.idempotency_key,
            };
            match state.credit.manual_adjust(adjustment).await {
                Ok(outcome) => {
                    info!(
                        request_id = %request_id,
                        user_id = %outcome.entry.user_id,
                        entry_id = outcome.entry.id,
                        idempotent = outcome.idempotent,
                        "manual ledger adjustment"
                    );
                    Json(json!({
                        "entry": outcome.entry,
                        "idempotent": outcome.idempotent,
                    }))
                    .into_response()
                }
                Err(err) => {
                    let (status, err) = credit_error(&err);
                    api_error_response(status, err)
                }
            }
        }
    };
    finish(&state, "/api/credits/manual", &request_id, started, response).await
}

fn ledger_filter_from_params(
    params: &HashMap<String, String>,
) -> Result<LedgerFilter, ApiError> {
    let mut filter = LedgerFilter::default();
    if let Some(raw) = params.get("start_date").or_else(|| params.get("startDate")) {
        filter.range.start = Some(
            parse_datetime(raw).map_err(|e| ApiError::validation_failed(e.to_string()))?,
        );
    }
    if let Some(raw) = params.get("end_date").or_else(|| params.get("endDate")) {
        filter.range.end = Some(
            parse_range_end(raw).map_err(|e| ApiError::validation_failed(e.to_string()))?,
        );
    }
    if let Some(raw) = params.get("entry_type").or_else(|| params.get("eventType")) {
        filter.entry_type = Some(
            raw.parse::<EntryType>()
                .map_err(|e| ApiError::validation_failed(e.to_string()))?,
        );
    }
    if let Some(raw) = params.get("scheme_id").or_else(|| params.get("schemeId")) {
        filter.scheme_id = Some(raw.parse::<i64>().map_err(|_| {
            ApiError::validation_failed(format!("scheme_id must be an integer, got {raw:?}"))
        })?);
    }
    Ok(filter)
}

pub(crate) async fn credit_statement_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match ledger_filter_from_params(&params) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(filter) => match state.credit.statement(&user_id, &filter).await {
            Ok(statement) => Json(json!({
                "user_id": user_id,
                "balance": statement.balance,
                "cost_incurred": statement.cost_incurred,
                "currency": state.api.default_currency,
                "history": statement.history,
            }))
            .into_response(),
            Err(err) => {
                let (status, err) = credit_error(&err);
                api_error_response(status, err)
            }
        },
    };
    finish(&state, "/api/credits/{user_id}", &request_id, started, response).await
}
