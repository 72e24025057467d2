// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{
        health::{HealthChecks, HealthReport, HealthResponse},
        token::{JwksResponse, TokenInfo, VerifyTokenRequest},
    },
    auth::Jwk,
    error::route_not_found,
    state::AppState,
};

pub mod health;
pub mod token;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/token/verify", post(token::verify_token))
        .route("/token/elevated", get(token::check_elevated));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/.well-known/jwks.json", get(token::jwks))
        .nest("/v1", v1_routes)
        .fallback(route_not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        token::verify_token,
        token::check_elevated,
        token::jwks
    ),
    components(
        schemas(
            HealthReport,
            HealthChecks,
            HealthResponse,
            VerifyTokenRequest,
            TokenInfo,
            JwksResponse,
            Jwk
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Token", description = "Access token verification and signing keys")
    )
)]
struct ApiDoc;
