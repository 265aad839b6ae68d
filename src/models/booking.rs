//! Booking model and related types

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::slot::SlotLabel;
use super::time_of_day;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Counts against the slot capacity
    pub fn is_occupying(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Approved | BookingStatus::Completed
        )
    }

    /// Still awaiting a decision or the booked day
    pub fn is_live(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one bookable cell of the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub equipment_id: i32,
    pub slot_id: i32,
    pub date: NaiveDate,
}

/// Booking record; never deleted, only moved through its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub equipment_id: i32,
    pub slot_template_id: i32,
    pub student_id: i32,
    pub supervisor_id: i32,
    pub date: NaiveDate,
    pub status: BookingStatus,
    /// Usage charge of the slot when the booking was made
    #[schema(value_type = String, example = "35.00")]
    pub cost: Decimal,
    pub slot_label: SlotLabel,
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "10:00")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "13:00")]
    pub end_time: NaiveTime,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i32>,
    pub rejection_reason: Option<String>,
}

impl Booking {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            equipment_id: self.equipment_id,
            slot_id: self.slot_template_id,
            date: self.date,
        }
    }
}

/// Booking request, made by a supervisor on behalf of a student
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBooking {
    pub equipment_id: i32,
    pub slot_template_id: i32,
    /// Booked day (YYYY-MM-DD)
    pub date: NaiveDate,
    pub student_id: i32,
    /// Defaults to the student's current supervisor
    pub supervisor_id: Option<i32>,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// Rejection request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectBooking {
    pub reason: String,
}

/// Booking query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BookingQuery {
    pub student_id: Option<i32>,
    pub supervisor_id: Option<i32>,
    pub equipment_id: Option<i32>,
    pub status: Option<BookingStatus>,
    /// Earliest booked day (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Latest booked day (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.student_id.map_or(true, |id| booking.student_id == id)
            && self.supervisor_id.map_or(true, |id| booking.supervisor_id == id)
            && self.equipment_id.map_or(true, |id| booking.equipment_id == id)
            && self.status.map_or(true, |status| booking.status == status)
            && self.from.map_or(true, |from| booking.date >= from)
            && self.to.map_or(true, |to| booking.date <= to)
    }
}
