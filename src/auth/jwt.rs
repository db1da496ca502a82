use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::responses::Role;
use crate::auth::{AuthConfig, AuthError, AuthResult};
use crate::models::Account;

/// Identity carried inside a session token. Carries no expiry: lifetime is
/// enforced by the cookie that transports the token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn for_account(account: &Account) -> Self {
        Self {
            sub: account.id,
            name: account.name.display(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::from_secret(&config.token_secret)
    }

    pub fn from_secret(secret: &str) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Config("token signing secret is empty".into()));
        }
        let secret_bytes = secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
        })
    }

    pub fn issue(&self, claims: &SessionClaims) -> AuthResult<String> {
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Any signature, encoding or shape problem is reported as [`AuthError::TokenInvalid`].
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                log::debug!("session token rejected: {err}");
                AuthError::TokenInvalid
            })
    }
}
