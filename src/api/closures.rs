//! Closure day endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::closure::{Closure, ClosureQuery, CreateClosure},
};

use super::AuthenticatedUser;

/// List closure days
#[utoipa::path(
    get,
    path = "/closures",
    tag = "closures",
    security(("bearer_auth" = [])),
    params(ClosureQuery),
    responses(
        (status = 200, description = "Closure days ordered by date", body = Vec<Closure>)
    )
)]
pub async fn list_closures(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ClosureQuery>,
) -> AppResult<Json<Vec<Closure>>> {
    let closures = state
        .services
        .calendar
        .list_closures(query.start_date, query.end_date)
        .await?;
    Ok(Json(closures))
}

/// Add a closure day (admin only)
#[utoipa::path(
    post,
    path = "/closures",
    tag = "closures",
    security(("bearer_auth" = [])),
    request_body = CreateClosure,
    responses(
        (status = 201, description = "Closure day added", body = Closure),
        (status = 409, description = "Date already closed")
    )
)]
pub async fn create_closure(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateClosure>,
) -> AppResult<(StatusCode, Json<Closure>)> {
    claims.require_admin()?;
    let closure = state.services.calendar.create_closure(&data).await?;
    Ok((StatusCode::CREATED, Json(closure)))
}

/// Remove a closure day (admin only)
#[utoipa::path(
    delete,
    path = "/closures/{id}",
    tag = "closures",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Closure ID")),
    responses(
        (status = 204, description = "Closure day removed"),
        (status = 404, description = "Closure not found")
    )
)]
pub async fn delete_closure(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.calendar.delete_closure(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
