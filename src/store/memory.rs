use std::collections::HashMap;

use chrono::Utc;
use rocket::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{AuthError, AuthResult, Role};
use crate::models::{Account, NewAccount};
use crate::store::AccountStore;

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    /// Lowercased email -> account id. Checked and written under the same lock as `accounts`.
    emails: HashMap<String, Uuid>,
}

/// Process-local store. The email index is updated atomically with inserts,
/// so racing registrations cannot both succeed.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: RwLock<Inner>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, mut account: NewAccount, bootstrap: bool) -> AuthResult<Account> {
        let mut inner = self.inner.write().await;
        let key = account.email.to_lowercase();
        if inner.emails.contains_key(&key) {
            return Err(AuthError::DuplicateIdentity);
        }
        if bootstrap && inner.accounts.is_empty() {
            account.role = Role::BOOTSTRAP;
        }

        let account = account.into_account(Utc::now());
        inner.emails.insert(key, account.id);
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(&email.to_lowercase())
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn count(&self) -> AuthResult<i64> {
        Ok(self.inner.read().await.accounts.len() as i64)
    }

    async fn create(&self, account: NewAccount) -> AuthResult<Account> {
        self.insert(account, false).await
    }

    async fn create_bootstrapping(&self, account: NewAccount) -> AuthResult<Account> {
        self.insert(account, true).await
    }

    async fn list(&self) -> AuthResult<Vec<Account>> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn update(&self, account: &Account) -> AuthResult<Account> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.accounts.get(&account.id) else {
            return Err(AuthError::NotFound);
        };

        let old_key = existing.email.to_lowercase();
        let new_key = account.email.to_lowercase();
        if old_key != new_key {
            if inner.emails.contains_key(&new_key) {
                return Err(AuthError::DuplicateIdentity);
            }
            inner.emails.remove(&old_key);
            inner.emails.insert(new_key, account.id);
        }

        let mut updated = account.clone();
        updated.updated_at = Utc::now();
        inner.accounts.insert(updated.id, updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::responses::Role;
    use crate::models::{Address, PersonName, ProfileImage};

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            id: Uuid::new_v4(),
            name: PersonName {
                first: "Grace".into(),
                middle: None,
                last: "Hopper".into(),
            },
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role: Role::User,
            phone: "050-0000000".into(),
            address: Address {
                state: None,
                country: "US".into(),
                city: "Arlington".into(),
                street: "Main".into(),
                house_number: "1".into(),
            },
            is_business: false,
            image: ProfileImage::default(),
        }
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_insensitive() {
        let store = MemoryAccountStore::new();
        store.create(new_account("grace@navy.mil")).await.expect("create");

        let duplicate = store.create(new_account("Grace@Navy.mil")).await;
        assert!(matches!(duplicate, Err(AuthError::DuplicateIdentity)));
        assert_eq!(store.count().await.expect("count"), 1);

        let found = store.find_by_email("GRACE@navy.mil").await.expect("lookup");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn update_replaces_record_and_rejects_unknown_ids() {
        let store = MemoryAccountStore::new();
        let mut account = store.create(new_account("grace@navy.mil")).await.expect("create");
        account.phone = "052-9999999".into();

        let updated = store.update(&account).await.expect("update");
        assert_eq!(updated.phone, "052-9999999");
        assert!(updated.updated_at >= account.created_at);

        let mut stranger = updated.clone();
        stranger.id = Uuid::new_v4();
        assert!(matches!(store.update(&stranger).await, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn only_the_first_bootstrapping_insert_is_promoted() {
        let store = std::sync::Arc::new(MemoryAccountStore::new());
        let handles: Vec<_> = ["a@x.com", "b@x.com", "c@x.com", "d@x.com"]
            .into_iter()
            .map(|email| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.create_bootstrapping(new_account(email)).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("task joined").expect("create");
        }

        let accounts = store.list().await.expect("list");
        assert_eq!(accounts.len(), 4);
        let admins = accounts.iter().filter(|a| a.role == Role::Admin).count();
        assert_eq!(admins, 1);

        let plain = store.create(new_account("e@x.com")).await.expect("create");
        assert_eq!(plain.role, Role::User);
    }
}
