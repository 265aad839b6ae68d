//! Credit account endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::credit::{AllocateCredit, CreditAccount, CreditTransaction, StudentCreditUsage},
};

use super::AuthenticatedUser;

/// Get a supervisor's credit account
#[utoipa::path(
    get,
    path = "/credits/{supervisor_id}",
    tag = "credits",
    security(("bearer_auth" = [])),
    params(("supervisor_id" = i32, Path, description = "Supervisor ID")),
    responses(
        (status = 200, description = "Credit account", body = CreditAccount),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(supervisor_id): Path<i32>,
) -> AppResult<Json<CreditAccount>> {
    let account = state
        .services
        .credits
        .account(&claims.actor(), supervisor_id)
        .await?;
    Ok(Json(account))
}

/// Allocate credit to a supervisor (admin only)
#[utoipa::path(
    post,
    path = "/credits/{supervisor_id}/allocations",
    tag = "credits",
    security(("bearer_auth" = [])),
    params(("supervisor_id" = i32, Path, description = "Supervisor ID")),
    request_body = AllocateCredit,
    responses(
        (status = 201, description = "Credit allocated", body = CreditAccount),
        (status = 400, description = "Amount out of range")
    )
)]
pub async fn allocate(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(supervisor_id): Path<i32>,
    Json(data): Json<AllocateCredit>,
) -> AppResult<(StatusCode, Json<CreditAccount>)> {
    claims.require_admin()?;
    let account = state
        .services
        .credits
        .allocate(&claims.actor(), supervisor_id, &data)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Credit journal of a supervisor
#[utoipa::path(
    get,
    path = "/credits/{supervisor_id}/transactions",
    tag = "credits",
    security(("bearer_auth" = [])),
    params(("supervisor_id" = i32, Path, description = "Supervisor ID")),
    responses(
        (status = 200, description = "Transactions, oldest first", body = Vec<CreditTransaction>)
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(supervisor_id): Path<i32>,
) -> AppResult<Json<Vec<CreditTransaction>>> {
    let transactions = state
        .services
        .credits
        .transactions(&claims.actor(), supervisor_id)
        .await?;
    Ok(Json(transactions))
}

/// Credit consumed by a student
#[utoipa::path(
    get,
    path = "/users/{id}/credit-usage",
    tag = "credits",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student credit usage", body = StudentCreditUsage),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_usage(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<StudentCreditUsage>> {
    let usage = state.services.credits.usage(&claims.actor(), id).await?;
    Ok(Json(usage))
}
