//! Route definitions for the LearnHub API.

pub mod admin;
pub mod affiliate;
pub mod auth;
pub mod certificates;
pub mod health;
pub mod learning_hub;
pub mod lessons;
pub mod tracks;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Largest accepted request body. Every endpoint takes small JSON payloads.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    let auth_routes = Router::new().route("/auth/me", get(auth::me));

    let learner_routes = Router::new()
        .route("/learning-hub", get(learning_hub::dashboard))
        .route("/learning-hub/analytics", get(learning_hub::analytics))
        .route("/learning-hub/streak", get(learning_hub::streak))
        .route(
            "/learning-hub/recommendations",
            get(learning_hub::recommendations),
        )
        .route("/learning-hub/stats", get(learning_hub::stats))
        .route("/tracks", get(tracks::list))
        .route("/tracks/{track}", get(tracks::get_by_slug))
        .route("/tracks/{track}/enroll", post(tracks::enroll))
        .route("/lessons/{id}/complete", post(lessons::complete))
        .route("/certificates", get(certificates::list_mine))
        .route("/certificates/verify/{code}", get(certificates::verify))
        .route("/affiliate/summary", get(affiliate::summary));

    let admin_routes = Router::new()
        .route("/admin/affiliates", get(admin::list_affiliates))
        .route(
            "/admin/payouts",
            get(admin::list_payouts).post(admin::create_payout),
        )
        .route("/admin/payouts/{id}/mark-paid", post(admin::mark_paid))
        .route("/admin/payouts/{id}/export", get(admin::export_payout))
        .route("/admin/payouts/{id}/audit", get(admin::payout_audit))
        .route("/admin/referrals/mature", post(admin::mature_referrals))
        .route(
            "/admin/enrollments/reconcile",
            post(admin::reconcile_enrollments),
        );

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", auth_routes)
        .nest("/api/v1", learner_routes)
        .nest("/api/v1", admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors),
        )
        .with_state(state)
}

/// CORS for the configured frontend origin.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(error = %e, frontend_url, "Invalid FRONTEND_URL, CORS allows no origins");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
