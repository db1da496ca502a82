//! Uniform JSON error body and the catchers that render guard failures.
//!
//! Route handlers return [`crate::auth::AuthError`], which serializes into
//! [`ErrorBody`]. Failures raised before a handler runs (request guards,
//! malformed bodies, unmatched routes) land in the catchers below so the
//! caller always sees the same `{"msg": ...}` shape.

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Catcher, Request, catch, catchers};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            details: Vec::new(),
        }
    }
}

#[catch(400)]
fn bad_request(_: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new("Invalid request body"))
}

#[catch(401)]
fn unauthorized(_: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new("Authentication Invalid"))
}

#[catch(403)]
fn forbidden(_: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new("Unauthorized to access this route"))
}

#[catch(404)]
fn not_found(request: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new(format!("Route {} does not exist", request.uri().path())))
}

#[catch(422)]
fn unprocessable(_: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new("Invalid request body"))
}

#[catch(500)]
fn internal(request: &Request<'_>) -> Json<ErrorBody> {
    log::error!("{} {} hit the internal error catcher", request.method(), request.uri());
    Json(ErrorBody::new("Internal Server Error"))
}

#[catch(default)]
fn fallback(status: Status, _: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new(status.reason_lossy()))
}

/// Catchers mounted at the root of the application.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal,
        fallback
    ]
}
