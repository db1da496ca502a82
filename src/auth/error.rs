use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::util::add_schema_response;
use thiserror::Error;

use crate::auth::validation::ValidationErrors;
use crate::error::ErrorBody;

pub type AuthResult<T> = Result<T, AuthError>;

const INTERNAL_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", .0.first_message())]
    Validation(ValidationErrors),
    #[error("Email already exists")]
    DuplicateIdentity,
    #[error("Please provide email and password")]
    MissingCredentials,
    /// Unknown email and wrong password share this variant so callers cannot probe for accounts.
    #[error("Invalid Credentials")]
    InvalidCredentials,
    #[error("Authentication Invalid")]
    TokenInvalid,
    #[error("Unauthorized to access this route")]
    Forbidden,
    #[error("Account not found")]
    NotFound,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::Validation(_)
            | AuthError::DuplicateIdentity
            | AuthError::MissingCredentials => Status::BadRequest,
            AuthError::InvalidCredentials | AuthError::TokenInvalid => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::NotFound => Status::NotFound,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_)
            | AuthError::Join(_) => Status::InternalServerError,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() == Status::InternalServerError
    }

    /// Caller-facing body. Internal failures never expose their detail.
    pub fn body(&self) -> ErrorBody {
        match self {
            AuthError::Validation(errors) => ErrorBody {
                msg: errors.first_message().to_string(),
                details: errors.messages(),
            },
            err if err.is_internal() => ErrorBody::new(INTERNAL_MESSAGE),
            err => ErrorBody::new(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Validation(errors)
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if self.is_internal() {
            log::error!("{} {} failed: {}", request.method(), request.uri(), self);
        } else {
            log::debug!(
                "{} {} rejected ({}): {}",
                request.method(),
                request.uri(),
                status.code,
                self
            );
        }

        (status, Json(self.body())).respond_to(request)
    }
}

impl OpenApiResponderInner for AuthError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let schema = generator.json_schema::<ErrorBody>();
        let mut responses = Responses::default();
        for code in [400, 401, 403, 404, 500] {
            add_schema_response(&mut responses, code, "application/json", schema.clone())?;
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validation::FieldError;

    #[test]
    fn internal_errors_hide_detail() {
        let err = AuthError::Config("CARDS_TOKEN_SECRET missing".into());
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.body().msg, INTERNAL_MESSAGE);
    }

    #[test]
    fn validation_reports_first_message_and_keeps_the_rest() {
        let errors = ValidationErrors::from(vec![
            FieldError::new("email", "Please provide email"),
            FieldError::new("phone", "Please provide phone number"),
        ]);
        let err = AuthError::from(errors);
        let body = err.body();
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(body.msg, "Please provide email");
        assert_eq!(body.details.len(), 2);
    }

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(AuthError::InvalidCredentials.status(), Status::Unauthorized);
        assert_eq!(AuthError::InvalidCredentials.body().msg, "Invalid Credentials");
        assert_eq!(AuthError::Forbidden.status(), Status::Forbidden);
    }
}
