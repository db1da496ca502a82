//! Schema checks for registration, login and profile payloads.
//!
//! Registration and profile forms are checked exhaustively and tolerate
//! unknown keys. Login short-circuits on missing credentials and rejects
//! unknown keys.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::auth::{AuthError, AuthResult};
use crate::models::{Address, PersonName, ProfileImage};

const LOGIN_FIELDS: [&str; 2] = ["email", "password"];

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every problem found in one payload, in the order the fields are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_message(&self) -> &str {
        self.0
            .first()
            .map(|err| err.message.as_str())
            .unwrap_or("Invalid request body")
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|err| err.message.clone()).collect()
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub name: PersonName,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: Address,
    pub is_business: bool,
    pub image: ProfileImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Fields a profile update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<PersonName>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub image: Option<ProfileImage>,
    pub password: Option<String>,
}

impl ProfileChanges {
    pub fn changes_password(&self) -> bool {
        self.password.is_some()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(body: &Value) -> Result<RegistrationInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let Some(root) = body.as_object() else {
        errors.push("body", "Request body must be an object");
        return Err(errors);
    };
    let mut fields = Fields::new(root, None, &mut errors);

    let name = fields
        .required_object("name", "Please provide name")
        .and_then(|name| read_name(name, &mut *fields.errors));
    let email = fields
        .required_str("email", "Please provide email")
        .and_then(|email| {
            let email = normalize_email(&email);
            if email_regex().is_match(&email) {
                Some(email)
            } else {
                fields.errors.push("email", "Invalid email format");
                None
            }
        });
    let password = fields.required_secret("password", "Please provide password");
    let phone = fields.required_str("phone", "Please provide phone number");
    let address = fields
        .required_object("address", "Please provide address")
        .and_then(|address| read_address(address, &mut *fields.errors));
    let is_business = fields.optional_bool("isBusiness");
    let image = match fields.optional_object("image") {
        Some(image) => read_image(image, fields.errors),
        None => Some(ProfileImage::default()),
    };

    match (name, email, password, phone, address, image) {
        (Some(name), Some(email), Some(password), Some(phone), Some(address), Some(image))
            if errors.is_empty() =>
        {
            Ok(RegistrationInput {
                name,
                email,
                password,
                phone,
                address,
                is_business: is_business.unwrap_or(false),
                image,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_login(body: &Value) -> AuthResult<LoginInput> {
    let root = body.as_object().ok_or(AuthError::MissingCredentials)?;

    let email = root
        .get("email")
        .and_then(Value::as_str)
        .map(normalize_email)
        .filter(|email| !email.is_empty());
    // Passwords are compared verbatim; only reject a missing or empty one.
    let password = root
        .get("password")
        .and_then(Value::as_str)
        .filter(|password| !password.is_empty())
        .map(str::to_string);

    let (Some(email), Some(password)) = (email, password) else {
        return Err(AuthError::MissingCredentials);
    };

    if let Some(unknown) = root.keys().find(|key| !LOGIN_FIELDS.contains(&key.as_str())) {
        let mut errors = ValidationErrors::default();
        errors.push(unknown, format!("\"{unknown}\" is not allowed"));
        return Err(AuthError::Validation(errors));
    }

    Ok(LoginInput { email, password })
}

pub fn validate_profile_update(body: &Value) -> Result<ProfileChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let Some(root) = body.as_object() else {
        errors.push("body", "Request body must be an object");
        return Err(errors);
    };
    let mut fields = Fields::new(root, None, &mut errors);

    let changes = ProfileChanges {
        name: fields
            .optional_object("name")
            .and_then(|name| read_name(name, &mut *fields.errors)),
        phone: fields.optional_str("phone"),
        address: fields
            .optional_object("address")
            .and_then(|address| read_address(address, &mut *fields.errors)),
        image: fields
            .optional_object("image")
            .and_then(|image| read_image(image, &mut *fields.errors)),
        password: fields.optional_secret("password"),
    };

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(errors)
    }
}

fn read_name(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<PersonName> {
    let mut fields = Fields::new(object, Some("name"), errors);
    let first = fields.required_str("first", "Please provide first name");
    let middle = fields.nullable_str("middle");
    let last = fields.required_str("last", "Please provide last name");
    Some(PersonName {
        first: first?,
        middle,
        last: last?,
    })
}

fn read_address(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Address> {
    let mut fields = Fields::new(object, Some("address"), errors);
    let state = fields.nullable_str("state");
    let country = fields.required_str("country", "Please provide country");
    let city = fields.required_str("city", "Please provide city");
    let street = fields.required_str("street", "Please provide street");
    let house_number = fields.required_str("houseNumber", "Please provide houseNumber");
    Some(Address {
        state,
        country: country?,
        city: city?,
        street: street?,
        house_number: house_number?,
    })
}

fn read_image(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<ProfileImage> {
    let mut fields = Fields::new(object, Some("image"), errors);
    let before = fields.errors.0.len();
    let url = fields.nullable_str("url");
    let alt = fields.nullable_str("alt");
    if fields.errors.0.len() > before {
        return None;
    }
    Some(ProfileImage::resolve(url, alt))
}

/// Reads typed values out of one JSON object, recording failures instead of stopping.
struct Fields<'a, 'e> {
    object: &'a Map<String, Value>,
    prefix: Option<&'static str>,
    errors: &'e mut ValidationErrors,
}

impl<'a, 'e> Fields<'a, 'e> {
    fn new(
        object: &'a Map<String, Value>,
        prefix: Option<&'static str>,
        errors: &'e mut ValidationErrors,
    ) -> Self {
        Self {
            object,
            prefix,
            errors,
        }
    }

    fn path(&self, key: &str) -> String {
        match self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        }
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn required_str(&mut self, key: &str, missing: &str) -> Option<String> {
        self.read_str(key, missing, true)
    }

    /// Like [`Self::required_str`] but keeps surrounding whitespace.
    fn required_secret(&mut self, key: &str, missing: &str) -> Option<String> {
        self.read_str(key, missing, false)
    }

    fn read_str(&mut self, key: &str, missing: &str, trim: bool) -> Option<String> {
        let path = self.path(key);
        match self.present(key) {
            None => {
                self.errors.push(&path, missing);
                None
            }
            Some(Value::String(value)) => {
                let value = if trim { value.trim() } else { value.as_str() };
                if value.is_empty() {
                    self.errors
                        .push(&path, format!("\"{path}\" is not allowed to be empty"));
                    None
                } else {
                    Some(value.to_string())
                }
            }
            Some(_) => {
                self.errors.push(&path, format!("\"{path}\" must be a string"));
                None
            }
        }
    }

    /// Optional string that, when present, must be non-empty.
    fn optional_str(&mut self, key: &str) -> Option<String> {
        self.present(key)?;
        self.required_str(key, "")
    }

    fn optional_secret(&mut self, key: &str) -> Option<String> {
        self.present(key)?;
        self.required_secret(key, "")
    }

    /// Optional string where `null` and `""` both mean "not provided".
    fn nullable_str(&mut self, key: &str) -> Option<String> {
        let path = self.path(key);
        match self.present(key)? {
            Value::String(value) if value.trim().is_empty() => None,
            Value::String(value) => Some(value.trim().to_string()),
            _ => {
                self.errors.push(&path, format!("\"{path}\" must be a string"));
                None
            }
        }
    }

    fn optional_bool(&mut self, key: &str) -> Option<bool> {
        let path = self.path(key);
        match self.present(key)? {
            Value::Bool(value) => Some(*value),
            _ => {
                self.errors.push(&path, format!("\"{path}\" must be a boolean"));
                None
            }
        }
    }

    fn required_object(&mut self, key: &str, missing: &str) -> Option<&'a Map<String, Value>> {
        if self.present(key).is_none() {
            let path = self.path(key);
            self.errors.push(&path, missing);
            return None;
        }
        self.optional_object(key)
    }

    fn optional_object(&mut self, key: &str) -> Option<&'a Map<String, Value>> {
        let path = self.path(key);
        match self.present(key)? {
            Value::Object(object) => Some(object),
            _ => {
                self.errors
                    .push(&path, format!("\"{path}\" must be of type object"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_PROFILE_IMAGE_URL;
    use serde_json::json;

    fn registration() -> Value {
        json!({
            "name": { "first": "Ada", "last": "Lovelace" },
            "email": "Ada@Example.com ",
            "password": "secret1",
            "phone": "050-0000000",
            "address": {
                "country": "UK",
                "city": "London",
                "street": "St James's Square",
                "houseNumber": "12"
            }
        })
    }

    #[test]
    fn accepts_complete_registration_and_applies_defaults() {
        let input = validate_registration(&registration()).expect("valid registration");
        assert_eq!(input.email, "ada@example.com");
        assert_eq!(input.name.first, "Ada");
        assert_eq!(input.address.state, None);
        assert!(!input.is_business);
        assert_eq!(input.image.url, DEFAULT_PROFILE_IMAGE_URL);
    }

    #[test]
    fn registration_tolerates_unknown_fields() {
        let mut body = registration();
        body["favouriteColour"] = json!("green");
        body["role"] = json!("admin");
        assert!(validate_registration(&body).is_ok());
    }

    #[test]
    fn registration_collects_every_error_in_field_order() {
        let mut body = registration();
        let root = body.as_object_mut().expect("object");
        root.remove("email");
        root.remove("phone");
        root.insert("address".into(), json!({ "country": "UK" }));

        let errors = validate_registration(&body).expect_err("invalid registration");
        assert_eq!(errors.first_message(), "Please provide email");
        assert_eq!(
            errors.messages(),
            vec![
                "Please provide email",
                "Please provide phone number",
                "Please provide city",
                "Please provide street",
                "Please provide houseNumber",
            ]
        );
    }

    #[test]
    fn each_required_field_is_enforced() {
        let cases = [
            ("/name/first", "Please provide first name"),
            ("/name/last", "Please provide last name"),
            ("/password", "Please provide password"),
            ("/address/country", "Please provide country"),
        ];
        for (pointer, expected) in cases {
            let mut body = registration();
            let (parent, key) = pointer.rsplit_once('/').expect("pointer");
            let target = if parent.is_empty() {
                &mut body
            } else {
                body.pointer_mut(parent).expect("parent exists")
            };
            target.as_object_mut().expect("object").remove(key);

            let errors = validate_registration(&body).expect_err(pointer);
            assert_eq!(errors.first_message(), expected, "field {pointer}");
        }
    }

    #[test]
    fn rejects_malformed_email_and_wrong_types() {
        let mut body = registration();
        body["email"] = json!("not-an-email");
        body["isBusiness"] = json!("yes");
        let errors = validate_registration(&body).expect_err("invalid");
        assert_eq!(
            errors.messages(),
            vec!["Invalid email format", "\"isBusiness\" must be a boolean"]
        );
    }

    #[test]
    fn passwords_keep_surrounding_whitespace() {
        let mut body = registration();
        body["password"] = json!(" pass word ");
        let input = validate_registration(&body).expect("valid registration");
        assert_eq!(input.password, " pass word ");

        let changes = validate_profile_update(&json!({ "password": "  new  " }))
            .expect("valid update");
        assert_eq!(changes.password.as_deref(), Some("  new  "));
    }

    #[test]
    fn login_requires_both_credentials() {
        let missing = validate_login(&json!({ "email": "a@x.com" }));
        assert!(matches!(missing, Err(AuthError::MissingCredentials)));

        let empty = validate_login(&json!({ "email": "", "password": "pw" }));
        assert!(matches!(empty, Err(AuthError::MissingCredentials)));

        let ok = validate_login(&json!({ "email": " A@X.com", "password": " pw " }))
            .expect("valid login");
        assert_eq!(ok.email, "a@x.com");
        assert_eq!(ok.password, " pw ");
    }

    #[test]
    fn login_rejects_unknown_fields() {
        let result = validate_login(&json!({
            "email": "a@x.com",
            "password": "pw",
            "remember": true
        }));
        match result {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors.first_message(), "\"remember\" is not allowed")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn profile_update_reads_only_present_fields() {
        let changes = validate_profile_update(&json!({ "phone": "052-1111111" }))
            .expect("valid update");
        assert_eq!(changes.phone.as_deref(), Some("052-1111111"));
        assert!(changes.name.is_none());
        assert!(!changes.changes_password());

        let errors = validate_profile_update(&json!({ "name": { "first": "Ada" }, "password": "" }))
            .expect_err("invalid update");
        assert_eq!(
            errors.messages(),
            vec!["Please provide last name", "\"password\" is not allowed to be empty"]
        );
    }
}
