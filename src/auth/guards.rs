use std::marker::PhantomData;

use rocket::Request;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use uuid::Uuid;

use crate::auth::jwt::SessionClaims;
use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState};

/// Identity attached to a request after its session cookie and token both verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Account id recorded in the request cache once authentication succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedAccount(pub Option<Uuid>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request) {
            Ok(user) => {
                request.local_cache(|| AuthenticatedAccount(Some(user.id)));
                Outcome::Success(user)
            }
            Err(err) => {
                if err.is_internal() {
                    log::error!("authentication guard failed: {err}");
                } else {
                    log::debug!("request to {} not authenticated: {err}", request.uri());
                }
                Outcome::Error((err.status(), err))
            }
        }
    }
}

fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let auth_state = request
        .rocket()
        .state::<AuthState>()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    // `get_private` only yields cookies whose encryption and authentication tag check out.
    let cookie = request
        .cookies()
        .get_private(&auth_state.config.session_cookie_name)
        .ok_or(AuthError::TokenInvalid)?;

    let claims = auth_state.token_service.verify(cookie.value())?;
    Ok(AuthUser::from(claims))
}

/// Exact-match role check; no role implies another.
pub fn authorize(identity: &AuthUser, allowed: &[Role]) -> AuthResult<()> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Allow the owner of `account_id`, or any identity holding one of `allowed`.
pub fn authorize_owner_or(identity: &AuthUser, account_id: Uuid, allowed: &[Role]) -> AuthResult<()> {
    if identity.id == account_id {
        Ok(())
    } else {
        authorize(identity, allowed)
    }
}

/// Roles a route admits.
pub trait RolePolicy: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// Guard that authenticates the request and then checks it against `P`.
#[derive(Debug, Clone)]
pub struct Authorized<P: RolePolicy> {
    pub user: AuthUser,
    _policy: PhantomData<P>,
}

pub type RequireAdmin = Authorized<AdminOnly>;

#[rocket::async_trait]
impl<'r, P: RolePolicy> FromRequest<'r> for Authorized<P> {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => match authorize(&user, P::ALLOWED) {
                Ok(()) => Outcome::Success(Authorized {
                    user,
                    _policy: PhantomData,
                }),
                Err(err) => {
                    log::debug!(
                        "account {} with role {} denied {}",
                        user.id,
                        user.role,
                        request.uri()
                    );
                    Outcome::Error((err.status(), err))
                }
            },
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => {
                let err = AuthError::TokenInvalid;
                Outcome::Error((err.status(), err))
            }
        }
    }
}

impl<'r> OpenApiFromRequest<'r> for AuthUser {
    fn from_request_input(
        _generator: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'r, P: RolePolicy> OpenApiFromRequest<'r> for Authorized<P> {
    fn from_request_input(
        _generator: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            role,
        }
    }

    #[test]
    fn admin_routes_reject_users_and_admit_admins() {
        assert!(matches!(
            authorize(&identity(Role::User), AdminOnly::ALLOWED),
            Err(AuthError::Forbidden)
        ));
        assert!(authorize(&identity(Role::Admin), AdminOnly::ALLOWED).is_ok());
    }

    #[test]
    fn roles_do_not_inherit() {
        assert!(matches!(
            authorize(&identity(Role::Admin), &[Role::User]),
            Err(AuthError::Forbidden)
        ));
        assert!(authorize(&identity(Role::Admin), &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            authorize(&identity(Role::User), &[]),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn owners_pass_without_a_privileged_role() {
        let user = identity(Role::User);
        assert!(authorize_owner_or(&user, user.id, &[Role::Admin]).is_ok());
        assert!(matches!(
            authorize_owner_or(&user, Uuid::new_v4(), &[Role::Admin]),
            Err(AuthError::Forbidden)
        ));
        assert!(authorize_owner_or(&identity(Role::Admin), user.id, &[Role::Admin]).is_ok());
    }
}
