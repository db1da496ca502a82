//! Account orchestration: registration, credential checks and profile mutations.
//!
//! Every save goes through [`AccountService::save`], which always asks the
//! password service to resolve the hash to store. Saves that carry no new
//! password therefore keep the stored hash byte-for-byte.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::responses::Role;
use crate::auth::validation::{LoginInput, ProfileChanges, RegistrationInput};
use crate::auth::{AuthError, AuthResult, PasswordService};
use crate::models::{Account, NewAccount};
use crate::store::AccountStore;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    passwords: Arc<PasswordService>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, passwords: Arc<PasswordService>) -> Self {
        Self { store, passwords }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Create an account from validated input. The first account of an empty
    /// store is privileged; later ones get the default role. The store decides
    /// emptiness atomically with the insert.
    pub async fn register(&self, input: RegistrationInput) -> AuthResult<Account> {
        if self.store.find_by_email(&input.email).await?.is_some() {
            return Err(AuthError::DuplicateIdentity);
        }

        let account = self.prepare(input, Role::default()).await?;
        self.store.create_bootstrapping(account).await
    }

    /// Create an account with an explicit role. The store's uniqueness guard
    /// still applies.
    pub async fn provision(&self, input: RegistrationInput, role: Role) -> AuthResult<Account> {
        let account = self.prepare(input, role).await?;
        self.store.create(account).await
    }

    async fn prepare(&self, input: RegistrationInput, role: Role) -> AuthResult<NewAccount> {
        let password_hash = self
            .passwords
            .resolve_hash(None, Some(input.password.clone()))
            .await?;
        Ok(build_account(input, role, password_hash))
    }

    /// Resolve login credentials to an account. Unknown emails and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, input: LoginInput) -> AuthResult<Account> {
        let Some(account) = self.store.find_by_email(&input.email).await? else {
            log::debug!("login rejected: no account for submitted email");
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .passwords
            .verify_password_blocking(input.password, account.password_hash.clone())
            .await?;
        if !verified {
            log::debug!("login rejected: password mismatch for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    pub async fn find(&self, id: Uuid) -> AuthResult<Account> {
        self.store.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    pub async fn list(&self) -> AuthResult<Vec<Account>> {
        self.store.list().await
    }

    pub async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AuthResult<Account> {
        let mut account = self.find(id).await?;
        let ProfileChanges {
            name,
            phone,
            address,
            image,
            password,
        } = changes;

        if let Some(name) = name {
            account.name = name;
        }
        if let Some(phone) = phone {
            account.phone = phone;
        }
        if let Some(address) = address {
            account.address = address;
        }
        if let Some(image) = image {
            account.image = image;
        }

        self.save(account, password).await
    }

    pub async fn toggle_business(&self, id: Uuid) -> AuthResult<Account> {
        let mut account = self.find(id).await?;
        account.is_business = !account.is_business;
        self.save(account, None).await
    }

    pub async fn change_role(&self, id: Uuid, role: Role) -> AuthResult<Account> {
        let mut account = self.find(id).await?;
        account.role = role;
        self.save(account, None).await
    }

    async fn save(&self, mut account: Account, new_password: Option<String>) -> AuthResult<Account> {
        account.password_hash = self
            .passwords
            .resolve_hash(Some(&account.password_hash), new_password)
            .await?;
        self.store.update(&account).await
    }
}

/// Factory for new account records; the only place identifiers are minted.
pub fn build_account(input: RegistrationInput, role: Role, password_hash: String) -> NewAccount {
    NewAccount {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
        password_hash,
        role,
        phone: input.phone,
        address: input.address,
        is_business: input.is_business,
        image: input.image,
    }
}
