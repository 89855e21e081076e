// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use paylane_core::ports::{Clock, SystemClock};
use paylane_rules::{CreditService, PromoService};
use paylane_store::StoreBackend;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

mod config;
mod http;
mod telemetry;

pub use config::{ApiConfig, CONFIG_SCHEMA_VERSION};
pub use telemetry::RequestMetrics;

pub const CRATE_NAME: &str = "paylane-server";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreBackend>,
    pub promo: Arc<PromoService>,
    pub credit: Arc<CreditService>,
    pub clock: Arc<dyn Clock>,
    pub api: ApiConfig,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        Self::with_config(store, ApiConfig::default(), Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_config(
        store: Arc<dyn StoreBackend>,
        api: ApiConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let promo = Arc::new(PromoService::new(store.clone(), clock.clone()));
        let credit = Arc::new(CreditService::new(store.clone(), clock.clone()));
        Self {
            store,
            promo,
            credit,
            clock,
            api,
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route(
            "/api/promocodes",
            get(http::promos::list_promos_handler).post(http::promos::create_promo_handler),
        )
        .route(
            "/api/promocodes/validate",
            post(http::promos::validate_promo_handler),
        )
        .route(
            "/api/promocodes/apply",
            post(http::promos::apply_promo_handler),
        )
        .route(
            "/api/promocodes/:id",
            delete(http::promos::delete_promo_handler),
        )
        .route(
            "/api/promocodes/:id/status",
            put(http::promos::promo_status_handler),
        )
        .route(
            "/api/promocodes/:id/campaign",
            post(http::promos::promo_campaign_handler),
        )
        .route(
            "/api/bonus-schemes",
            get(http::credits::list_schemes_handler).post(http::credits::create_scheme_handler),
        )
        .route(
            "/api/bonus-schemes/:id",
            get(http::credits::get_scheme_handler)
                .put(http::credits::update_scheme_handler)
                .delete(http::credits::delete_scheme_handler),
        )
        .route(
            "/api/credits/award-bonus",
            post(http::credits::award_bonus_handler),
        )
        .route(
            "/api/credits/manual",
            post(http::credits::manual_adjust_handler),
        )
        .route(
            "/api/credits/:user_id",
            get(http::credits::credit_statement_handler),
        )
        .route(
            "/api/referral-rules",
            get(http::referrals::list_rules_handler).post(http::referrals::create_rule_handler),
        )
        .route(
            "/api/referral-rules/:id",
            get(http::referrals::get_rule_handler)
                .put(http::referrals::update_rule_handler)
                .delete(http::referrals::delete_rule_handler),
        )
        .route(
            "/api/transactions",
            get(http::referrals::list_transactions_handler)
                .post(http::referrals::create_transaction_handler),
        )
        .route(
            "/api/transactions/:id",
            get(http::referrals::get_transaction_handler),
        )
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
