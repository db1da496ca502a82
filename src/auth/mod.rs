//! Authentication module: configuration, input validation, credential
//! hashing, session tokens, Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod service;
pub mod validation;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, Authorized, RequireAdmin};
pub use jwt::{SessionClaims, TokenService};
pub use passwords::PasswordService;
pub use responses::Role;
pub use service::AccountService;

use crate::store::AccountStore;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub token_service: Arc<TokenService>,
    pub accounts: AccountService,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        token_service: TokenService,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        let password_service = Arc::new(password_service);
        Self {
            config,
            accounts: AccountService::new(store, Arc::clone(&password_service)),
            password_service,
            token_service: Arc::new(token_service),
        }
    }

    /// Build every service from configuration around the given store.
    pub fn from_config(config: AuthConfig, store: Arc<dyn AccountStore>) -> AuthResult<Self> {
        let password_service = PasswordService::with_cost(config.hash_cost)?;
        let token_service = TokenService::from_config(&config)?;
        Ok(Self::new(config, password_service, token_service, store))
    }
}
