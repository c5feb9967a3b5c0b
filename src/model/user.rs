use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

pub type Id = u64;

/// Picture given to users that register without one.
pub const DEFAULT_PICTURE: &str = "https://placekitten.com/g/300/300";

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("email pattern is valid");
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: Id,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub picture: String,
    /// Plain text password, only ever read from requests.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip)] // Never expose the hash to clients
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Which set of rules [`User::validate`] applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Registration and updates.
    #[default]
    Default,
    Login,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Carries the field name as clients know it.
    #[error("required {0}")]
    Required(&'static str),
    #[error("invalid email")]
    InvalidEmail,
}

impl User {
    /// Check the mandatory fields for the given mode.
    ///
    /// Only the first failing rule is reported.
    pub fn validate(&self, mode: Mode) -> Result<(), ValidationError> {
        if mode == Mode::Default && self.username.is_empty() {
            return Err(ValidationError::Required("nickname"));
        }

        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }

        if self.email.is_empty() {
            return Err(ValidationError::Required("Email"));
        }

        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

fn is_zero(id: &Id) -> bool {
    *id == 0
}
