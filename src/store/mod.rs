//! Account persistence.
//!
//! [`AccountStore`] is the seam the authentication core talks to. The
//! Postgres implementation backs the running service; the in-memory one
//! serves tests and database-less local runs. Both enforce email uniqueness
//! themselves, so the service-level lookup is only a fast path.

use rocket::async_trait;
use uuid::Uuid;

use crate::auth::{AuthResult, Role};
use crate::models::{Account, NewAccount};

pub mod memory;
pub mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>>;

    async fn count(&self) -> AuthResult<i64>;

    /// Insert a new account with the role it carries. Fails with
    /// `DuplicateIdentity` when the email is taken.
    async fn create(&self, account: NewAccount) -> AuthResult<Account>;

    /// Insert a new account, replacing its role with [`Role::BOOTSTRAP`] when
    /// the store holds no accounts at insert time. The emptiness check and the
    /// insert are one atomic step.
    async fn create_bootstrapping(&self, account: NewAccount) -> AuthResult<Account>;

    /// All accounts, oldest first.
    async fn list(&self) -> AuthResult<Vec<Account>>;

    /// Persist every mutable field of `account` and bump `updated_at`.
    async fn update(&self, account: &Account) -> AuthResult<Account>;
}
