use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use parley_core::claims::ClaimStore;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    claims: Arc<ClaimStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub claims: HealthCheck,
    pub checked_at: String,
}

pub fn router(claims: Arc<ClaimStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { claims })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let claims = claims_check(&state.claims);
    let ready = claims.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "parley-server runtime initialized".to_string(),
        },
        claims,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn claims_check(store: &ClaimStore) -> HealthCheck {
    if store.is_empty() {
        HealthCheck {
            status: "degraded",
            detail: "claim store is empty; lookups will always miss".to_string(),
        }
    } else {
        HealthCheck { status: "ready", detail: format!("{} claim records loaded", store.len()) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use parley_core::claims::ClaimStore;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_claims_are_seeded() {
        let (status, Json(payload)) =
            health(State(HealthState { claims: Arc::new(ClaimStore::demo()) })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.claims.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_when_the_claim_store_is_empty() {
        let (status, Json(payload)) =
            health(State(HealthState { claims: Arc::new(ClaimStore::new(Vec::new())) })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.claims.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
