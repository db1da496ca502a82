use chrono::{DateTime, Utc};
use rocket::async_trait;
use rocket_db_pools::sqlx::{self, FromRow, PgPool};
use uuid::Uuid;

use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult};
use crate::models::{Account, Address, NewAccount, PersonName, ProfileImage};
use crate::store::AccountStore;

const ACCOUNT_COLUMNS: &str = "id, first_name, middle_name, last_name, email, password_hash, role, phone, \
     address_state, address_country, address_city, address_street, address_house_number, \
     is_business, image_url, image_alt, created_at, updated_at";

/// SQLSTATE raised by Postgres for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Advisory lock key held for the duration of every account insert.
const ACCOUNT_INSERT_LOCK: i64 = 0x6361_7264_735f_6163;

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: String,
    address_state: Option<String>,
    address_country: String,
    address_city: String,
    address_street: String,
    address_house_number: String,
    is_business: bool,
    image_url: String,
    image_alt: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AuthError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|err| AuthError::Sqlx(sqlx::Error::Decode(Box::new(err))))?;

        Ok(Account {
            id: row.id,
            name: PersonName {
                first: row.first_name,
                middle: row.middle_name,
                last: row.last_name,
            },
            email: row.email,
            password_hash: row.password_hash,
            role,
            phone: row.phone,
            address: Address {
                state: row.address_state,
                country: row.address_country,
                city: row.address_city,
                street: row.address_street,
                house_number: row.address_house_number,
            },
            is_business: row.is_business,
            image: ProfileImage {
                url: row.image_url,
                alt: row.image_alt,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut account: NewAccount, bootstrap: bool) -> AuthResult<Account> {
        let mut tx = self.pool.begin().await?;

        // Serializes inserts so only one transaction can observe an empty table.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ACCOUNT_INSERT_LOCK)
            .execute(&mut *tx)
            .await?;
        if bootstrap {
            let populated: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts)")
                .fetch_one(&mut *tx)
                .await?;
            if !populated {
                account.role = Role::BOOTSTRAP;
            }
        }

        let sql = format!(
            "INSERT INTO accounts (id, first_name, middle_name, last_name, email, password_hash, role, phone, \
             address_state, address_country, address_city, address_street, address_house_number, \
             is_business, image_url, image_alt) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id)
            .bind(&account.name.first)
            .bind(&account.name.middle)
            .bind(&account.name.last)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(&account.phone)
            .bind(&account.address.state)
            .bind(&account.address.country)
            .bind(&account.address.city)
            .bind(&account.address.street)
            .bind(&account.address.house_number)
            .bind(account.is_business)
            .bind(&account.image.url)
            .bind(&account.image.alt)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_violation)?;
        tx.commit().await?;
        Account::try_from(row)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    async fn count(&self) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, account: NewAccount) -> AuthResult<Account> {
        self.insert(account, false).await
    }

    async fn create_bootstrapping(&self, account: NewAccount) -> AuthResult<Account> {
        self.insert(account, true).await
    }

    async fn list(&self) -> AuthResult<Vec<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update(&self, account: &Account) -> AuthResult<Account> {
        let sql = format!(
            "UPDATE accounts SET first_name = $2, middle_name = $3, last_name = $4, email = $5, \
             password_hash = $6, role = $7, phone = $8, address_state = $9, address_country = $10, \
             address_city = $11, address_street = $12, address_house_number = $13, is_business = $14, \
             image_url = $15, image_alt = $16, updated_at = NOW() \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id)
            .bind(&account.name.first)
            .bind(&account.name.middle)
            .bind(&account.name.last)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(&account.phone)
            .bind(&account.address.state)
            .bind(&account.address.country)
            .bind(&account.address.city)
            .bind(&account.address.street)
            .bind(&account.address.house_number)
            .bind(account.is_business)
            .bind(&account.image.url)
            .bind(&account.image.alt)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        row.map(Account::try_from).transpose()?.ok_or(AuthError::NotFound)
    }
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AuthError::DuplicateIdentity
        }
        _ => AuthError::Sqlx(err),
    }
}
