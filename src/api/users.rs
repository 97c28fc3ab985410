//! User CRUD endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::dto::users::{CreateUserRequest, UpdateUserRequest, UserQuery, UserResponse};
use crate::dto::{ApiResponse, Page};
use crate::error::AppError;
use crate::serializer::users::{
    MSG_CREATED, MSG_DELETED, MSG_LISTED, MSG_RETRIEVED, MSG_UPDATED,
};
use crate::AppState;

/// Parse a path id. Rendered as a 400 envelope on malformed input
/// instead of the extractor's plain-text rejection.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid user id {raw:?}")))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), AppError> {
    let user = state.users.create(&state.shutdown, body).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::created(MSG_CREATED, user))))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id)?;
    let user = state.users.get(&state.shutdown, id).await?;
    Ok(Json(ApiResponse::success(MSG_RETRIEVED, user)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let (users, page) = state.users.list(&state.shutdown, query).await?;
    Ok(Json(ApiResponse::success_page(MSG_LISTED, users, Page::from(page))))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id)?;
    let user = state.users.update(&state.shutdown, id, body).await?;
    Ok(Json(ApiResponse::success(MSG_UPDATED, user)))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, AppError> {
    let id = parse_id(&id)?;
    state.users.delete(&state.shutdown, id).await?;
    Ok(Json(ApiResponse::ok(MSG_DELETED)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
