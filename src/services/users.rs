//! User service
//!
//! Validates payloads, short-circuits on shutdown, and drives the store.
//! Handlers own the envelope rendering; this layer returns DTOs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{PaginationResult, UserStore};
use crate::dto::users::{CreateUserRequest, UpdateUserRequest, UserQuery, UserResponse};
use crate::error::AppError;
use crate::serializer::UserSerializer;

pub struct UserService {
    store: Arc<dyn UserStore>,
    serializer: UserSerializer,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            serializer: UserSerializer,
        }
    }

    pub async fn create(
        &self,
        cancel: &CancellationToken,
        req: CreateUserRequest,
    ) -> Result<UserResponse, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        req.validate()?;

        let input = self.serializer.create_input(&req);
        let record = self.store.create(cancel, input).await.map_err(|e| {
            error!(error = %e, "failed to create user");
            e
        })?;

        info!(user_id = %record.id, "created user");
        Ok(self.serializer.response(record))
    }

    pub async fn get(&self, cancel: &CancellationToken, id: Uuid) -> Result<UserResponse, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if id.is_nil() {
            return Err(AppError::MissingId);
        }

        let record = self
            .store
            .get_by_id(cancel, id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;

        Ok(self.serializer.response(record))
    }

    pub async fn list(
        &self,
        cancel: &CancellationToken,
        query: UserQuery,
    ) -> Result<(Vec<UserResponse>, PaginationResult), AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let filter = self.serializer.filter(&query)?;
        let (records, page) = self.store.list(cancel, &filter).await.map_err(|e| {
            error!(error = %e, "failed to list users");
            e
        })?;

        let users = records
            .into_iter()
            .map(|record| self.serializer.response(record))
            .collect();

        Ok((users, page))
    }

    pub async fn update(
        &self,
        cancel: &CancellationToken,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if id.is_nil() {
            return Err(AppError::MissingId);
        }
        req.validate()?;

        let update = self.serializer.update_input(&req)?;
        if update.is_empty() {
            return Err(AppError::MissingUpdate);
        }

        let record = self
            .store
            .update(cancel, id, &update)
            .await
            .map_err(|e| {
                error!(user_id = %id, error = %e, "failed to update user");
                e
            })?
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;

        info!(user_id = %id, "updated user");
        Ok(self.serializer.response(record))
    }

    pub async fn delete(&self, cancel: &CancellationToken, id: Uuid) -> Result<(), AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if id.is_nil() {
            return Err(AppError::MissingId);
        }

        let deleted = self.store.delete(cancel, id).await.map_err(|e| {
            error!(user_id = %id, error = %e, "failed to delete user");
            e
        })?;

        if !deleted {
            return Err(AppError::NotFound("user".to_string()));
        }

        info!(user_id = %id, "deleted user");
        Ok(())
    }
}
