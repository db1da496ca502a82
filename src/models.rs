use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::responses::Role;

/// Image shown for accounts that never uploaded one.
pub const DEFAULT_PROFILE_IMAGE_URL: &str = "https://res.cloudinary.com/dlpjcvsii/image/upload/v1688459756/file-upload/tmp-1-1688459755587_hvt1fy.png";

// ===== Account Components =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PersonName {
    pub first: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    pub last: String,
}

impl PersonName {
    /// Name as it is carried in session claims.
    pub fn display(&self) -> String {
        match self.middle.as_deref() {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first, middle, self.last)
            }
            _ => format!("{} {}", self.first, self.last),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl ProfileImage {
    /// Build the stored image, substituting the system default when no URL was supplied.
    pub fn resolve(url: Option<String>, alt: Option<String>) -> Self {
        let url = url
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE_URL.to_string());
        let alt = alt.filter(|value| !value.is_empty());
        Self { url, alt }
    }
}

impl Default for ProfileImage {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

// ===== Account Records =====

/// Persisted account. Deliberately not `Serialize`: responses go through [`AccountView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: PersonName,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: Address,
    pub is_business: bool,
    pub image: ProfileImage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully-formed account ready for insertion. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub name: PersonName,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: Address,
    pub is_business: bool,
    pub image: ProfileImage,
}

impl NewAccount {
    pub fn into_account(self, now: DateTime<Utc>) -> Account {
        Account {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            phone: self.phone,
            address: self.address,
            is_business: self.is_business,
            image: self.image,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public projection of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub name: PersonName,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub address: Address,
    pub is_business: bool,
    pub image: ProfileImage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            phone: account.phone.clone(),
            address: account.address.clone(),
            is_business: account.is_business,
            image: account.image.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}
