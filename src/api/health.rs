// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// Overall health status.
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Active signing algorithm.
    pub signing_algorithm: String,
    /// Whether tokens are enriched with custom claims.
    pub custom_claims: bool,
    /// Elevated claim policy.
    pub elevated_policy: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Reports the configuration snapshot currently in use.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthReport)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let snapshot = state.jwt.load();

    Json(HealthReport {
        status: "ok".to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            signing_algorithm: format!("{:?}", snapshot.signing().algorithm()),
            custom_claims: snapshot.issuer.has_custom_claims(),
            elevated_policy: state.gate.policy().to_string(),
        },
    })
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
