//! User payload translation
//!
//! Maps request DTOs to repository inputs and records back to response
//! DTOs. Validation of field formats lives on the DTOs; this layer only
//! converts shapes and rejects values with no storage representation.

use uuid::Uuid;

use crate::db::{
    CreateUser, PaginationFilter, UserFilter, UserMetadata, UserRecord, UserStatus, UserUpdate,
};
use crate::dto::users::{CreateUserRequest, UpdateUserRequest, UserQuery, UserResponse};
use crate::error::AppError;

pub const MSG_CREATED: &str = "Successfully created a user";
pub const MSG_RETRIEVED: &str = "Successfully got a user";
pub const MSG_LISTED: &str = "Successfully got a list of user";
pub const MSG_UPDATED: &str = "Successfully updated a user";
pub const MSG_DELETED: &str = "Successfully deleted a user";

#[derive(Debug, Clone, Copy, Default)]
pub struct UserSerializer;

impl UserSerializer {
    /// New accounts start active.
    pub fn create_input(&self, req: &CreateUserRequest) -> CreateUser {
        CreateUser {
            name: req.name.clone(),
            email: req.email.clone(),
            status: UserStatus::Active,
            metadata: UserMetadata {
                sex: req.sex.clone().unwrap_or_default(),
                address: req.address.clone().unwrap_or_default(),
                phone: req.phone.clone().unwrap_or_default(),
            },
        }
    }

    /// Build the sparse change set. Any present metadata field replaces
    /// the whole metadata document.
    pub fn update_input(&self, req: &UpdateUserRequest) -> Result<UserUpdate, AppError> {
        let status = req
            .status
            .map(|raw| {
                UserStatus::from_i32(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown status {raw}")))
            })
            .transpose()?;

        let metadata = if req.sex.is_some() || req.address.is_some() || req.phone.is_some() {
            Some(UserMetadata {
                sex: req.sex.clone().unwrap_or_default(),
                address: req.address.clone().unwrap_or_default(),
                phone: req.phone.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(UserUpdate {
            name: req.name.clone(),
            email: req.email.clone(),
            status,
            metadata,
        })
    }

    pub fn filter(&self, query: &UserQuery) -> Result<UserFilter, AppError> {
        let ids = match query.ids.as_deref() {
            Some(raw) => parse_uuid_list(raw)?,
            None => Vec::new(),
        };

        let status = query
            .status
            .map(|raw| {
                UserStatus::from_i32(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown status {raw}")))
            })
            .transpose()?;

        Ok(UserFilter {
            ids,
            name: query.name.clone(),
            email: query.email.clone(),
            status,
            sex: query.sex.clone(),
            address: query.address.clone(),
            phone: query.phone.clone(),
            page: PaginationFilter {
                min_created: query.created_at_gte,
                max_created: query.created_at_lte,
                min_updated: query.updated_at_gte,
                max_updated: query.updated_at_lte,
                with_deleted: query.include_deleted,
                show_count: query.show_count,
                offset: query.offset,
                limit: query.limit,
                order_by: query.order_by.clone(),
            },
        })
    }

    pub fn response(&self, record: UserRecord) -> UserResponse {
        UserResponse {
            id: record.id,
            name: record.name,
            email: record.email,
            status: record.status.as_i32(),
            metadata: record.metadata,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Parse a comma-separated UUID list; empty tokens are skipped.
fn parse_uuid_list(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Uuid::parse_str(token).map_err(|_| AppError::BadRequest(format!("invalid id {token:?}")))
        })
        .collect()
}
