//! Slot template endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::slot::{CreateSlotTemplate, SlotTemplate, UpdateSlotTemplate},
};

use super::AuthenticatedUser;

/// Add a slot template to an equipment
#[utoipa::path(
    post,
    path = "/equipment/{id}/slots",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = CreateSlotTemplate,
    responses(
        (status = 201, description = "Slot template added", body = SlotTemplate),
        (status = 400, description = "Invalid slot"),
        (status = 409, description = "Overlaps another slot template")
    )
)]
pub async fn add_slot(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CreateSlotTemplate>,
) -> AppResult<(StatusCode, Json<SlotTemplate>)> {
    claims.require_staff()?;
    let slot = state.services.slots.add_slot(&claims.actor(), id, &data).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Update a slot template
#[utoipa::path(
    put,
    path = "/equipment/{id}/slots/{slot_id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID"),
        ("slot_id" = i32, Path, description = "Slot template ID")
    ),
    request_body = UpdateSlotTemplate,
    responses(
        (status = 200, description = "Slot template updated", body = SlotTemplate),
        (status = 404, description = "Slot template not found"),
        (status = 409, description = "Overlap, or capacity below existing bookings")
    )
)]
pub async fn update_slot(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, slot_id)): Path<(i32, i32)>,
    Json(data): Json<UpdateSlotTemplate>,
) -> AppResult<Json<SlotTemplate>> {
    claims.require_staff()?;
    let slot = state
        .services
        .slots
        .update_slot(&claims.actor(), id, slot_id, &data)
        .await?;
    Ok(Json(slot))
}

/// Delete a slot template
#[utoipa::path(
    delete,
    path = "/equipment/{id}/slots/{slot_id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID"),
        ("slot_id" = i32, Path, description = "Slot template ID")
    ),
    responses(
        (status = 204, description = "Slot template deleted"),
        (status = 404, description = "Slot template not found"),
        (status = 409, description = "Upcoming bookings reference the slot")
    )
)]
pub async fn delete_slot(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, slot_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    state
        .services
        .slots
        .delete_slot(&claims.actor(), id, slot_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
