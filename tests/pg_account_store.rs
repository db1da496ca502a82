use std::sync::Arc;

use cards_api::auth::validation::validate_registration;
use cards_api::auth::{AuthError, Role};
use cards_api::auth::service::build_account;
use cards_api::store::{AccountStore, PgAccountStore};
use cards_api::test_support::{TestDatabase, TestDatabaseError};
use serde_json::json;

async fn provision_db(test: &str) -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping {test}: container runtime unavailable ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn new_account(email: &str) -> cards_api::models::NewAccount {
    let input = validate_registration(&json!({
        "name": { "first": "Grace", "middle": "Brewster", "last": "Hopper" },
        "email": email,
        "password": "unused",
        "phone": "050-1111111",
        "address": {
            "state": "NY",
            "country": "USA",
            "city": "New York",
            "street": "Broadway",
            "houseNumber": "1"
        },
        "isBusiness": true,
        "image": { "url": "https://img.test/grace.png", "alt": "Grace" }
    }))
    .expect("valid registration");
    build_account(input, Role::User, "$argon2id$placeholder".into())
}

#[tokio::test]
async fn create_and_read_back_accounts() {
    let Some(test_db) = provision_db("create_and_read_back_accounts").await else {
        return;
    };
    let store = PgAccountStore::new(test_db.pool_clone());

    let created = store
        .create(new_account("grace@example.com"))
        .await
        .expect("create");
    assert_eq!(created.name.middle.as_deref(), Some("Brewster"));
    assert_eq!(created.address.state.as_deref(), Some("NY"));
    assert!(created.is_business);
    assert_eq!(created.image.alt.as_deref(), Some("Grace"));

    let by_email = store
        .find_by_email("GRACE@example.com")
        .await
        .expect("lookup")
        .expect("account exists");
    assert_eq!(by_email.id, created.id);

    let by_id = store
        .find_by_id(created.id)
        .await
        .expect("lookup")
        .expect("account exists");
    assert_eq!(by_id.email, "grace@example.com");
    assert_eq!(store.count().await.expect("count"), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn duplicate_emails_map_to_duplicate_identity() {
    let Some(test_db) = provision_db("duplicate_emails_map_to_duplicate_identity").await else {
        return;
    };
    let store = PgAccountStore::new(test_db.pool_clone());

    store
        .create(new_account("grace@example.com"))
        .await
        .expect("create");
    let second = store.create(new_account("Grace@Example.com")).await;

    assert!(matches!(second, Err(AuthError::DuplicateIdentity)));
    assert_eq!(store.count().await.expect("count"), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn concurrent_creates_keep_one_account() {
    let Some(test_db) = provision_db("concurrent_creates_keep_one_account").await else {
        return;
    };
    let store = Arc::new(PgAccountStore::new(test_db.pool_clone()));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(new_account("race@example.com")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.expect("task joined") {
            Ok(_) => created += 1,
            Err(AuthError::DuplicateIdentity) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.count().await.expect("count"), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn racing_bootstrapping_creates_promote_one_account() {
    let Some(test_db) = provision_db("racing_bootstrapping_creates_promote_one_account").await else {
        return;
    };
    let store = Arc::new(PgAccountStore::new(test_db.pool_clone()));

    let handles: Vec<_> = ["a@example.com", "b@example.com", "c@example.com", "d@example.com"]
        .into_iter()
        .map(|email| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create_bootstrapping(new_account(email)).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task joined").expect("create");
    }

    let accounts = store.list().await.expect("list");
    assert_eq!(accounts.len(), 4);
    assert_eq!(
        accounts.iter().filter(|a| a.role == Role::Admin).count(),
        1
    );

    let later = store
        .create_bootstrapping(new_account("e@example.com"))
        .await
        .expect("create");
    assert_eq!(later.role, Role::User);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn update_persists_changes_and_reports_missing_rows() {
    let Some(test_db) = provision_db("update_persists_changes_and_reports_missing_rows").await else {
        return;
    };
    let store = PgAccountStore::new(test_db.pool_clone());

    let mut account = store
        .create(new_account("grace@example.com"))
        .await
        .expect("create");
    account.role = Role::Admin;
    account.is_business = false;
    account.phone = "052-2222222".into();

    let updated = store.update(&account).await.expect("update");
    assert_eq!(updated.role, Role::Admin);
    assert!(!updated.is_business);
    assert_eq!(updated.phone, "052-2222222");
    assert_eq!(updated.password_hash, account.password_hash);
    assert!(updated.updated_at >= account.updated_at);

    let mut ghost = account.clone();
    ghost.id = uuid::Uuid::new_v4();
    assert!(matches!(store.update(&ghost).await, Err(AuthError::NotFound)));

    let listed = store.list().await.expect("list");
    assert_eq!(listed.len(), 1);

    test_db.close().await.expect("failed to drop test database");
}
