// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::AppState;
use axum::extract::{Path, State};
use paylane_api::convert::promo_definition;
use paylane_api::{
    ApplyPromoRequest, CreatePromoRequest, UpdatePromoStatusRequest, ValidatePromoRequest,
};
use paylane_core::ports::Clock;
use paylane_core::sha256_hex;
use paylane_model::{Currency, PaymentMethod};
use paylane_rules::TransactionContext;
use paylane_store::StoreBackend;
use serde_json::json;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_promos_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match state.store.list_promos().await {
        Ok(promos) => {
            let payload = json!({"promocodes": promos});
            let etag = format!(
                "\"{}\"",
                sha256_hex(&serde_json::to_vec(&payload).unwrap_or_default())
            );
            if if_none_match(&headers).as_deref() == Some(etag.as_str()) {
                let mut response = StatusCode::NOT_MODIFIED.into_response();
                put_cache_headers(response.headers_mut(), state.api.discovery_ttl, &etag);
                response
            } else {
                let mut response = Json(payload).into_response();
                put_cache_headers(response.headers_mut(), state.api.discovery_ttl, &etag);
                response
            }
        }
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCode);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/promocodes", &request_id, started, response).await
}

pub(crate) async fn create_promo_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<CreatePromoRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match promo_definition(&req, &state.api.default_currency) {
            Err(invalid) => api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::ValidationFailed,
                    "invalid promo definition",
                    json!({"message": invalid.to_string()}),
                ),
            ),
            Ok(definition) => {
                let code = definition.code.clone();
                match state
                    .store
                    .insert_promo(definition, state.clock.now())
                    .await
                {
                    Ok(promo) => {
                        info!(request_id = %request_id, code = %code, "promo code created");
                        (StatusCode::CREATED, Json(json!({"promo": promo}))).into_response()
                    }
                    Err(err) => {
                        let (status, err) = store_error(&err, ApiErrorCode::DuplicateCode);
                        api_error_response(status, err)
                    }
                }
            }
        },
    };
    finish(&state, "/api/promocodes", &request_id, started, response).await
}

pub(crate) async fn promo_status_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match parse_body::<UpdatePromoStatusRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match state.store.set_promo_status(id, req.status).await {
            Ok(promo) => {
                info!(request_id = %request_id, id, status = promo.status.as_str(), "promo status changed");
                Json(json!({"promo": promo})).into_response()
            }
            Err(err) => {
                let (status, err) = store_error(&err, ApiErrorCode::DuplicateCode);
                api_error_response(status, err)
            }
        },
    };
    finish(
        &state,
        "/api/promocodes/{id}/status",
        &request_id,
        started,
        response,
    )
    .await
}

pub(crate) async fn promo_campaign_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.touch_promo_campaign(id, state.clock.now()).await {
        Ok(promo) => Json(json!({"promo": promo})).into_response(),
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCode);
            api_error_response(status, err)
        }
    };
    finish(
        &state,
        "/api/promocodes/{id}/campaign",
        &request_id,
        started,
        response,
    )
    .await
}

pub(crate) async fn delete_promo_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let response = match state.store.delete_promo(id).await {
        Ok(()) => {
            info!(request_id = %request_id, id, "promo code deleted");
            Json(json!({"deleted": true, "id": id})).into_response()
        }
        Err(err) => {
            let (status, err) = store_error(&err, ApiErrorCode::DuplicateCode);
            api_error_response(status, err)
        }
    };
    finish(&state, "/api/promocodes/{id}", &request_id, started, response).await
}

fn context_from_request(req: &ValidatePromoRequest) -> Result<TransactionContext, ApiError> {
    let source_currency = Currency::parse(&req.source_currency)
        .map_err(|e| ApiError::validation_failed(e.to_string()))?;
    let currency = match req.currency.as_deref() {
        Some(raw) => {
            Currency::parse(raw).map_err(|e| ApiError::validation_failed(e.to_string()))?
        }
        None => source_currency.clone(),
    };
    Ok(TransactionContext {
        amount: req.amount,
        currency,
        source_currency,
        dest_currency: Currency::parse(&req.dest_currency)
            .map_err(|e| ApiError::validation_failed(e.to_string()))?,
        payment_method: PaymentMethod::parse(&req.payment_method)
            .map_err(|e| ApiError::validation_failed(e.to_string()))?,
        user_id: req.user_id.clone().filter(|u| !u.trim().is_empty()),
        affiliate_id: req.affiliate_id.clone().filter(|a| !a.trim().is_empty()),
    })
}

pub(crate) async fn validate_promo_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<ValidatePromoRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => match context_from_request(&req) {
            Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
            Ok(ctx) => match state.promo.validate(&req.code, &ctx).await {
                Ok(validated) => Json(json!({
                    "valid": true,
                    "promo": validated.promo,
                    "discount_amount": validated.quote.discount_amount,
                    "fee_waived": validated.quote.fee_waived,
                    "rate_boost": validated.quote.rate_boost,
                }))
                .into_response(),
                Err(err) => {
                    let (status, err) = promo_error(&err);
                    api_error_response(status, err)
                }
            },
        },
    };
    finish(
        &state,
        "/api/promocodes/validate",
        &request_id,
        started,
        response,
    )
    .await
}

pub(crate) async fn apply_promo_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let response = match parse_body::<ApplyPromoRequest>(body) {
        Err(err) => api_error_response(StatusCode::BAD_REQUEST, err),
        Ok(req) => {
            let user_id = req.user_id.as_deref().filter(|u| !u.trim().is_empty());
            match state
                .promo
                .apply(&req.code, req.discount_amount, user_id)
                .await
            {
                Ok(promo) => {
                    info!(
                        request_id = %request_id,
                        code = %promo.code,
                        usage_count = promo.usage_count,
                        "promo redemption committed"
                    );
                    Json(json!({
                        "applied": true,
                        "code": promo.code,
                        "usage_count": promo.usage_count,
                        "total_discount_utilized": promo.total_discount_utilized,
                    }))
                    .into_response()
                }
                Err(err) => {
                    let (status, err) = promo_error(&err);
                    api_error_response(status, err)
                }
            }
        }
    };
    finish(
        &state,
        "/api/promocodes/apply",
        &request_id,
        started,
        response,
    )
    .await
}
