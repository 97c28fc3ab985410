//! User endpoint payloads and query parameters

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::UserMetadata;
use crate::error::AppError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

/// E.164: a `+`, a non-zero leading digit, at most 15 digits total.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").unwrap()
});

const MAX_TEXT_LEN: usize = 255;

/// Body of `POST /v1/users`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        if let Some(sex) = &self.sex {
            validate_sex(sex)?;
        }
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

/// Body of `PUT /v1/users/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<i32>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(sex) = &self.sex {
            validate_sex(sex)?;
        }
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

/// Query parameters of `GET /v1/users`. Parameter names are kebab-case
/// on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    /// Comma-separated UUID list
    pub ids: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<i32>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,

    #[serde(rename = "include-deleted")]
    pub include_deleted: Option<bool>,
    #[serde(rename = "show-count")]
    pub show_count: Option<bool>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "order-by")]
    pub order_by: Option<String>,

    #[serde(rename = "created-at-gte")]
    pub created_at_gte: Option<DateTime<Utc>>,
    #[serde(rename = "created-at-lte")]
    pub created_at_lte: Option<DateTime<Utc>>,
    #[serde(rename = "updated-at-gte")]
    pub updated_at_gte: Option<DateTime<Utc>>,
    #[serde(rename = "updated-at-lte")]
    pub updated_at_lte: Option<DateTime<Utc>>,
}

/// A user as rendered in response envelopes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: i32,
    pub metadata: UserMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "name must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation(format!("invalid email {email:?}")));
    }
    Ok(())
}

fn validate_sex(sex: &str) -> Result<(), AppError> {
    match sex {
        "male" | "female" => Ok(()),
        other => Err(AppError::Validation(format!(
            "sex must be one of male, female, got {other:?}"
        ))),
    }
}

fn validate_address(address: &str) -> Result<(), AppError> {
    if address.len() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "address must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), AppError> {
    if !PHONE_RE.is_match(phone) {
        return Err(AppError::Validation(format!(
            "phone must be in E.164 format, got {phone:?}"
        )));
    }
    Ok(())
}
