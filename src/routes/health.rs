//! Readiness probe that also confirms the account store answers.

use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::AuthState;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// `ok` when the account store is reachable, `degraded` otherwise.
    pub status: String,
}

#[openapi(tag = "Health")]
#[get("/health")]
pub async fn health_check(state: &State<AuthState>) -> status::Custom<Json<HealthResponse>> {
    match state.accounts.store().count().await {
        Ok(_) => status::Custom(
            Status::Ok,
            Json(HealthResponse {
                status: "ok".to_string(),
            }),
        ),
        Err(err) => {
            log::warn!("health check could not reach account store: {err}");
            status::Custom(
                Status::ServiceUnavailable,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                }),
            )
        }
    }
}
