use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post, put};
use rocket_okapi::openapi;
use serde_json::Value;
use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::guards::{AuthUser, RequireAdmin, authorize_owner_or};
use crate::auth::jwt::SessionClaims;
use crate::auth::responses::{
    LoginResponse, MessageResponse, Role, RoleChangeRequest, UserResponse, UsersResponse,
};
use crate::auth::validation::{validate_login, validate_profile_update, validate_registration};
use crate::auth::{AuthConfig, AuthResult, AuthState};
use crate::models::AccountView;

/// Roles that may act on accounts other than their own.
const ACCOUNT_MANAGERS: &[Role] = &[Role::Admin];

#[openapi(tag = "Users")]
#[post("/users/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<Value>,
) -> AuthResult<status::Custom<Json<MessageResponse>>> {
    let input = validate_registration(&payload)?;
    let account = state.accounts.register(input).await?;
    log::info!("registered account {} with role {}", account.id, account.role);

    Ok(status::Custom(
        Status::Created,
        Json(MessageResponse::new("User Registered Successfully!")),
    ))
}

#[openapi(tag = "Users")]
#[post("/users/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<Value>,
) -> AuthResult<Json<LoginResponse>> {
    let input = validate_login(&payload)?;
    let account = state.accounts.authenticate(input).await?;
    let token = state
        .token_service
        .issue(&SessionClaims::for_account(&account))?;

    cookies.add_private(session_cookie(&state.config, token.clone()));
    log::info!("account {} logged in", account.id);

    Ok(Json(LoginResponse { token }))
}

#[openapi(tag = "Users")]
#[delete("/users/logout")]
pub async fn logout(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    user: AuthUser,
) -> Json<MessageResponse> {
    cookies.remove_private(removal_cookie(&state.config));
    log::info!("account {} logged out", user.id);
    Json(MessageResponse::new("user logged out!"))
}

#[openapi(tag = "Users")]
#[get("/users")]
pub async fn list_users(
    state: &State<AuthState>,
    _admin: RequireAdmin,
) -> AuthResult<Json<UsersResponse>> {
    let users = state
        .accounts
        .list()
        .await?
        .into_iter()
        .map(AccountView::from)
        .collect();
    Ok(Json(UsersResponse { users }))
}

#[openapi(tag = "Users")]
#[get("/users/<id>")]
pub async fn get_user(
    state: &State<AuthState>,
    user: AuthUser,
    id: Uuid,
) -> AuthResult<Json<UserResponse>> {
    authorize_owner_or(&user, id, ACCOUNT_MANAGERS)?;
    let account = state.accounts.find(id).await?;
    Ok(Json(UserResponse {
        user: AccountView::from(account),
    }))
}

#[openapi(tag = "Users")]
#[put("/users/<id>", data = "<payload>")]
pub async fn update_user(
    state: &State<AuthState>,
    user: AuthUser,
    id: Uuid,
    payload: Json<Value>,
) -> AuthResult<Json<UserResponse>> {
    authorize_owner_or(&user, id, ACCOUNT_MANAGERS)?;
    let changes = validate_profile_update(&payload)?;
    let password_changed = changes.changes_password();
    let account = state.accounts.update_profile(id, changes).await?;
    log::info!(
        "account {} updated by {} (password changed: {})",
        account.id,
        user.id,
        password_changed
    );
    Ok(Json(UserResponse {
        user: AccountView::from(account),
    }))
}

#[openapi(tag = "Users")]
#[patch("/users/<id>")]
pub async fn toggle_business(
    state: &State<AuthState>,
    user: AuthUser,
    id: Uuid,
) -> AuthResult<Json<UserResponse>> {
    authorize_owner_or(&user, id, ACCOUNT_MANAGERS)?;
    let account = state.accounts.toggle_business(id).await?;
    log::info!(
        "account {} business status set to {} by {}",
        account.id,
        account.is_business,
        user.id
    );
    Ok(Json(UserResponse {
        user: AccountView::from(account),
    }))
}

#[openapi(tag = "Users")]
#[patch("/users/<id>/role", data = "<payload>")]
pub async fn change_role(
    state: &State<AuthState>,
    admin: RequireAdmin,
    id: Uuid,
    payload: Json<RoleChangeRequest>,
) -> AuthResult<Json<UserResponse>> {
    let account = state.accounts.change_role(id, payload.role).await?;
    log::info!(
        "account {} role set to {} by {}",
        account.id,
        account.role,
        admin.user.id
    );
    Ok(Json(UserResponse {
        user: AccountView::from(account),
    }))
}

fn session_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    let ttl = TimeDuration::seconds(config.session_ttl_secs);
    Cookie::build((config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(config.cookie_secure)
        .max_age(ttl)
        .expires(OffsetDateTime::now_utc() + ttl)
        .build()
}

/// Must match the session cookie's attributes or cross-site browsers ignore it.
fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(config.cookie_secure)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_cross_site_and_expires_in_a_day() {
        let config = AuthConfig::with_secret("secret");
        let cookie = session_cookie(&config, "abc".into());

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(TimeDuration::hours(24)));
        let expires = cookie.expires_datetime().expect("expiry set");
        assert!(expires > OffsetDateTime::now_utc() + TimeDuration::hours(23));
    }

    #[test]
    fn production_cookies_are_secure() {
        let config = AuthConfig {
            cookie_secure: true,
            ..AuthConfig::with_secret("secret")
        };
        assert_eq!(session_cookie(&config, "abc".into()).secure(), Some(true));
        assert_eq!(removal_cookie(&config).secure(), Some(true));
    }

    #[test]
    fn removal_cookie_matches_session_cookie_scope() {
        let config = AuthConfig::with_secret("secret");
        let session = session_cookie(&config, "abc".into());
        let removal = removal_cookie(&config);

        assert_eq!(removal.name(), session.name());
        assert_eq!(removal.path(), session.path());
        assert_eq!(removal.same_site(), session.same_site());
        assert_eq!(removal.secure(), session.secure());
    }
}
