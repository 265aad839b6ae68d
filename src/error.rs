//! Error types for Labbook server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::booking::BookingStatus;

/// Application error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    NotAuthenticated = 3,
    NoSuchData = 4,
    BadValue = 5,
    Conflict = 6,
    SlotOverlap = 7,
    NotBookable = 8,
    SlotFull = 9,
    InsufficientCredit = 10,
    InvalidTransition = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot overlaps slot {conflicting_slot_id} of equipment {equipment_id}")]
    Overlap {
        equipment_id: i32,
        conflicting_slot_id: i32,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not bookable: {0}")]
    NotBookable(String),

    #[error("Slot {slot_id} of equipment {equipment_id} is full on {date} ({capacity} max)")]
    Capacity {
        equipment_id: i32,
        slot_id: i32,
        date: NaiveDate,
        capacity: u32,
    },

    #[error("Supervisor {supervisor_id} has {balance} credit, {required} required")]
    InsufficientCredit {
        supervisor_id: i32,
        balance: Decimal,
        required: Decimal,
    },

    #[error("Cannot {action} booking {booking_id} while {status}")]
    InvalidTransition {
        booking_id: i32,
        status: BookingStatus,
        action: &'static str,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Overlap { .. } => (StatusCode::CONFLICT, ErrorCode::SlotOverlap, message),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone())
            }
            AppError::NotBookable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NotBookable, msg.clone())
            }
            AppError::Capacity { .. } => (StatusCode::CONFLICT, ErrorCode::SlotFull, message),
            AppError::InsufficientCredit { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InsufficientCredit, message)
            }
            AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, ErrorCode::InvalidTransition, message)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
