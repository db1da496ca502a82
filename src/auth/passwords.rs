use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;

/// Argon2id cost factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashCost {
    /// Defaults overridden by `CARDS_HASH_M_COST_KIB` and `CARDS_HASH_T_COST`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_kib: std::env::var("CARDS_HASH_M_COST_KIB")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.memory_kib),
            iterations: std::env::var("CARDS_HASH_T_COST")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.iterations),
            parallelism: defaults.parallelism,
        }
    }
}

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> AuthResult<Self> {
        Self::with_cost(HashCost::default())
    }

    pub fn with_cost(cost: HashCost) -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(cost.memory_kib);
        builder.t_cost(cost.iterations);
        builder.p_cost(cost.parallelism);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        Ok(Self { argon2 })
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(AuthError::from)?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::from(err)),
        }
    }

    /// [`Self::hash_password`] on the blocking pool so request workers stay free.
    pub async fn hash_password_blocking(&self, password: String) -> AuthResult<String> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&password)).await?
    }

    /// [`Self::verify_password`] on the blocking pool so request workers stay free.
    pub async fn verify_password_blocking(
        &self,
        password: String,
        encoded: String,
    ) -> AuthResult<bool> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &encoded)).await?
    }

    /// Hash to store after a save. A new password is always hashed; without one the
    /// current hash is returned untouched so an already-hashed value is never re-hashed.
    pub async fn resolve_hash(
        &self,
        current: Option<&str>,
        new_password: Option<String>,
    ) -> AuthResult<String> {
        match (new_password, current) {
            (Some(password), _) => self.hash_password_blocking(password).await,
            (None, Some(existing)) => Ok(existing.to_string()),
            (None, None) => Err(AuthError::PasswordHash(
                "no password supplied for a new credential".into(),
            )),
        }
    }
}
