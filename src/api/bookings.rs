//! Booking ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::booking::{Booking, BookingQuery, CreateBooking, RejectBooking},
};

use super::AuthenticatedUser;

/// List bookings visible to the caller
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(BookingQuery),
    responses(
        (status = 200, description = "Bookings ordered by date and start time", body = Vec<Booking>)
    )
)]
pub async fn list_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookingQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings = state.services.bookings.list(&claims.actor(), query).await?;
    Ok(Json(bookings))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get(&claims.actor(), id).await?;
    Ok(Json(booking))
}

/// Request a slot on behalf of a student
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Pending booking created", body = Booking),
        (status = 400, description = "Student not assigned to the supervisor"),
        (status = 409, description = "Slot is full"),
        (status = 422, description = "Slot is closed on that date")
    )
)]
pub async fn request_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    claims.require_staff()?;
    let booking = state.services.bookings.request(&claims.actor(), &data).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Approve a pending booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/approve",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking approved", body = Booking),
        (status = 409, description = "Booking is not pending"),
        (status = 422, description = "Insufficient credit")
    )
)]
pub async fn approve_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_staff()?;
    let booking = state.services.bookings.approve(&claims.actor(), id).await?;
    Ok(Json(booking))
}

/// Reject a pending booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/reject",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = RejectBooking,
    responses(
        (status = 200, description = "Booking rejected", body = Booking),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Booking is not pending")
    )
)]
pub async fn reject_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<RejectBooking>,
) -> AppResult<Json<Booking>> {
    claims.require_staff()?;
    let booking = state
        .services
        .bookings
        .reject(&claims.actor(), id, &data.reason)
        .await?;
    Ok(Json(booking))
}

/// Cancel an approved booking and refund it
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 409, description = "Booking is not approved, or its day has come")
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_staff()?;
    let booking = state.services.bookings.cancel(&claims.actor(), id).await?;
    Ok(Json(booking))
}

/// Mark an approved booking as completed
#[utoipa::path(
    post,
    path = "/bookings/{id}/complete",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking completed", body = Booking),
        (status = 409, description = "Booking is not approved, or its day has not come")
    )
)]
pub async fn complete_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    claims.require_staff()?;
    let booking = state.services.bookings.complete(&claims.actor(), id).await?;
    Ok(Json(booking))
}
