//! User directory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, TransferStudent, User, UserQuery},
};

use super::AuthenticatedUser;

/// List users (supervisors see their own students)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Users", body = Vec<User>),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<User>>> {
    claims.require_staff()?;
    let users = state.services.users.list_users(&claims.actor(), query).await?;
    Ok(Json(users))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not visible to the caller"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(&claims.actor(), id).await?;
    Ok(Json(user))
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_admin()?;
    let user = state.services.users.create_user(&claims.actor(), &data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Move a student under another supervisor (admin only)
#[utoipa::path(
    put,
    path = "/users/{id}/supervisor",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    request_body = TransferStudent,
    responses(
        (status = 200, description = "Student transferred", body = User),
        (status = 400, description = "Not a student or not a supervisor"),
        (status = 404, description = "User not found")
    )
)]
pub async fn transfer_student(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<TransferStudent>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;
    let user = state
        .services
        .users
        .transfer_student(&claims.actor(), id, data.supervisor_id)
        .await?;
    Ok(Json(user))
}
