//! API handlers for Labbook REST endpoints

pub mod auth;
pub mod bookings;
pub mod closures;
pub mod credits;
pub mod equipment;
pub mod health;
pub mod openapi;
pub mod slots;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.users.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/supervisor", put(users::transfer_student))
        .route("/users/:id/credit-usage", get(credits::get_usage))
        // Equipment
        .route("/equipment", get(equipment::list_equipment).post(equipment::create_equipment))
        .route(
            "/equipment/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::remove_equipment),
        )
        .route("/equipment/:id/status", put(equipment::set_status))
        .route("/equipment/:id/availability", get(equipment::get_availability))
        // Slot templates
        .route("/equipment/:id/slots", post(slots::add_slot))
        .route(
            "/equipment/:id/slots/:slot_id",
            put(slots::update_slot).delete(slots::delete_slot),
        )
        // Bookings
        .route("/bookings", get(bookings::list_bookings).post(bookings::request_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/approve", post(bookings::approve_booking))
        .route("/bookings/:id/reject", post(bookings::reject_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/complete", post(bookings::complete_booking))
        // Credits
        .route("/credits/:supervisor_id", get(credits::get_account))
        .route("/credits/:supervisor_id/allocations", post(credits::allocate))
        .route("/credits/:supervisor_id/transactions", get(credits::list_transactions))
        // Closures
        .route("/closures", get(closures::list_closures).post(closures::create_closure))
        .route("/closures/:id", delete(closures::delete_closure))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
