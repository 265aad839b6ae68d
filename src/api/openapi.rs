//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, bookings, closures, credits, equipment, health, slots, users};

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Labbook API",
        version = "1.0.0",
        description = "Laboratory equipment booking REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::transfer_student,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::remove_equipment,
        equipment::set_status,
        equipment::get_availability,
        // Slot templates
        slots::add_slot,
        slots::update_slot,
        slots::delete_slot,
        // Bookings
        bookings::list_bookings,
        bookings::get_booking,
        bookings::request_booking,
        bookings::approve_booking,
        bookings::reject_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        // Credits
        credits::get_account,
        credits::allocate,
        credits::list_transactions,
        credits::get_usage,
        // Closures
        closures::list_closures,
        closures::create_closure,
        closures::delete_closure,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::UserQuery,
            crate::models::user::CreateUser,
            crate::models::user::TransferStudent,
            // Equipment
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::LabHours,
            crate::models::equipment::MaintenanceDetails,
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::MaintenanceRequest,
            crate::models::equipment::SetEquipmentStatus,
            crate::models::equipment::EquipmentSort,
            crate::models::equipment::EquipmentQuery,
            // Slot templates
            crate::models::slot::SlotLabel,
            crate::models::slot::SlotTemplate,
            crate::models::slot::CreateSlotTemplate,
            crate::models::slot::UpdateSlotTemplate,
            // Availability
            crate::models::availability::SlotState,
            crate::models::availability::ClosedReason,
            crate::models::availability::SlotAvailability,
            crate::models::availability::DayAvailability,
            crate::models::availability::WeekAvailability,
            // Bookings
            crate::models::booking::BookingStatus,
            crate::models::booking::Booking,
            crate::models::booking::CreateBooking,
            crate::models::booking::RejectBooking,
            crate::models::booking::BookingQuery,
            // Credits
            crate::models::credit::CreditAccount,
            crate::models::credit::StudentCreditUsage,
            crate::models::credit::TransactionKind,
            crate::models::credit::CreditTransaction,
            crate::models::credit::AllocateCredit,
            // Closures
            crate::models::closure::Closure,
            crate::models::closure::CreateClosure,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User directory"),
        (name = "equipment", description = "Equipment, slot templates and availability"),
        (name = "bookings", description = "Booking ledger"),
        (name = "credits", description = "Supervisor credit accounts"),
        (name = "closures", description = "Non-bookable days")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
