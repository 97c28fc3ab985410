//! Users repository: records, filter composition and CRUD over PostgreSQL

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::json_column::JsonColumn;
use super::pagination::{paginate, FilteredQuery, OrderMap, PaginationFilter, PaginationResult};
use super::{Database, DbPools, DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH};
use crate::error::AppError;

/// Trusted table identifier; never sourced from client input.
pub const USERS_TABLE: &str = "users";

const USER_COLUMNS: &str =
    "users.id, users.name, users.email, users.status, users.metadata, \
     users.created_at, users.updated_at, users.deleted_at";

/// Fields clients may order user listings by.
pub fn user_order_map() -> OrderMap {
    OrderMap::base().allow("name").allow("email")
}

/// User account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Inactive,
    Active,
    Banned,
}

impl UserStatus {
    pub fn as_i32(&self) -> i32 {
        match self {
            UserStatus::Inactive => 0,
            UserStatus::Active => 1,
            UserStatus::Banned => 2,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(UserStatus::Inactive),
            1 => Some(UserStatus::Active),
            2 => Some(UserStatus::Banned),
            _ => None,
        }
    }
}

/// Nested document stored in the `metadata` JSONB column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

/// A user row
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    pub metadata: UserMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, PgRow> for UserRecord {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let status: i32 = row.try_get("status")?;
        let metadata: Option<JsonValue> = row.try_get("metadata")?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            status: UserStatus::from_i32(status).ok_or_else(|| {
                sqlx::Error::Decode(format!("unknown user status {status}").into())
            })?,
            metadata: JsonColumn::from_value(metadata)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
                .into_inner(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    pub metadata: UserMetadata,
}

/// Sparse change set for an update; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub metadata: Option<UserMetadata>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.status.is_none()
            && self.metadata.is_none()
    }
}

/// Optional query constraints for user listings; absent fields impose
/// no constraint.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub ids: Vec<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub page: PaginationFilter,
}

/// Translate the present filter fields into query predicates. Free-text
/// fields match case-insensitive substrings; structured fields match
/// exactly; metadata fields go through JSONB field extraction.
pub fn push_filter(query: &mut FilteredQuery<'_>, filter: &UserFilter) {
    if !filter.ids.is_empty() {
        let ids = filter.ids.clone();
        query.predicate(move |qb| {
            qb.push("users.id = ANY(").push_bind(ids.clone()).push(")");
        });
    }

    if let Some(name) = &filter.name {
        let pattern = format!("%{name}%");
        query.predicate(move |qb| {
            qb.push("users.name ILIKE ").push_bind(pattern.clone());
        });
    }

    if let Some(email) = &filter.email {
        let email = email.clone();
        query.predicate(move |qb| {
            qb.push("users.email = ").push_bind(email.clone());
        });
    }

    if let Some(status) = filter.status {
        query.predicate(move |qb| {
            qb.push("users.status = ").push_bind(status.as_i32());
        });
    }

    if let Some(sex) = &filter.sex {
        let sex = sex.clone();
        query.predicate(move |qb| {
            qb.push("users.metadata->>'sex' = ").push_bind(sex.clone());
        });
    }

    if let Some(address) = &filter.address {
        let pattern = format!("%{address}%");
        query.predicate(move |qb| {
            qb.push("users.metadata->>'address' ILIKE ").push_bind(pattern.clone());
        });
    }

    if let Some(phone) = &filter.phone {
        let phone = phone.clone();
        query.predicate(move |qb| {
            qb.push("users.metadata->>'phone' = ").push_bind(phone.clone());
        });
    }
}

/// Storage capability consumed by the user service
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, cancel: &CancellationToken, user: CreateUser) -> Result<UserRecord, AppError>;

    async fn get_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<Option<UserRecord>, AppError>;

    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: &UserFilter,
    ) -> Result<(Vec<UserRecord>, PaginationResult), AppError>;

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Uuid,
        update: &UserUpdate,
    ) -> Result<Option<UserRecord>, AppError>;

    async fn delete(&self, cancel: &CancellationToken, id: Uuid) -> Result<bool, AppError>;
}

/// PostgreSQL-backed user repository. Fetches its handle from the
/// injected connection cache on every operation, which revalidates the
/// pooled connection before use.
pub struct UserRepository {
    pools: Arc<DbPools>,
    conn_key: String,
}

impl UserRepository {
    pub fn new(pools: Arc<DbPools>) -> Self {
        Self {
            pools,
            conn_key: DbPools::key(DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH),
        }
    }

    async fn database(&self, cancel: &CancellationToken) -> Result<Database, AppError> {
        self.pools.get(&self.conn_key, cancel).await
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, cancel: &CancellationToken, user: CreateUser) -> Result<UserRecord, AppError> {
        let db = self.database(cancel).await?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let metadata = JsonColumn::new(&user.metadata)
            .to_value()
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, status, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.status.as_i32())
        .bind(&metadata)
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await?;

        self.get_by_id(cancel, id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".to_string()))
    }

    async fn get_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let db = self.database(cancel).await?;

        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(db.pool())
        .await?;

        Ok(record)
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: &UserFilter,
    ) -> Result<(Vec<UserRecord>, PaginationResult), AppError> {
        let db = self.database(cancel).await?;

        let mut query = FilteredQuery::new(USERS_TABLE, USER_COLUMNS);
        push_filter(&mut query, filter);

        let mut result = PaginationResult::default();
        let mut data = paginate(
            query,
            db.pool(),
            USERS_TABLE,
            &user_order_map(),
            &filter.page,
            &mut result,
        )
        .await?;

        let records = data
            .build_query_as::<UserRecord>()
            .fetch_all(db.pool())
            .await?;

        Ok((records, result))
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Uuid,
        update: &UserUpdate,
    ) -> Result<Option<UserRecord>, AppError> {
        if update.is_empty() {
            return Err(AppError::MissingUpdate);
        }

        let db = self.database(cancel).await?;

        let mut qb = sqlx::QueryBuilder::new("UPDATE users SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(name) = &update.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(email) = &update.email {
            qb.push(", email = ").push_bind(email.clone());
        }
        if let Some(status) = update.status {
            qb.push(", status = ").push_bind(status.as_i32());
        }
        if let Some(metadata) = &update.metadata {
            let value = JsonColumn::new(metadata)
                .to_value()
                .map_err(|e| AppError::Internal(e.into()))?;
            qb.push(", metadata = ").push_bind(value);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND deleted_at IS NULL");

        let affected = qb.build().execute(db.pool()).await?.rows_affected();
        if affected == 0 {
            return Ok(None);
        }

        self.get_by_id(cancel, id).await
    }

    async fn delete(&self, cancel: &CancellationToken, id: Uuid) -> Result<bool, AppError> {
        let db = self.database(cancel).await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
