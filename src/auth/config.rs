use crate::auth::passwords::HashCost;
use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded from environment variables.
///
/// The cookie layer is signed with Rocket's own `secret_key`; `token_secret`
/// only signs token contents, so the two trust boundaries use distinct keys.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub session_cookie_name: String,
    pub session_ttl_secs: i64,
    pub cookie_secure: bool,
    pub hash_cost: HashCost,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let token_secret = std::env::var("CARDS_TOKEN_SECRET")
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::Config("CARDS_TOKEN_SECRET is required".into()))?;
        let session_cookie_name =
            std::env::var("CARDS_SESSION_COOKIE_NAME").unwrap_or_else(|_| "token".into());
        let session_ttl_secs = std::env::var("CARDS_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24 * 60 * 60);
        let cookie_secure = std::env::var("CARDS_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let hash_cost = HashCost::from_env();

        Ok(Self {
            token_secret,
            session_cookie_name,
            session_ttl_secs,
            cookie_secure,
            hash_cost,
        })
    }

    /// Development defaults around an explicit token secret.
    pub fn with_secret(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            session_cookie_name: "token".into(),
            session_ttl_secs: 24 * 60 * 60,
            cookie_secure: false,
            hash_cost: HashCost::default(),
        }
    }
}
