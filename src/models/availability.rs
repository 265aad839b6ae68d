//! Availability grid returned by the resolver

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::slot::SlotLabel;
use super::time_of_day;

/// State of one calendar cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Available,
    Full,
    Closed,
}

/// Why a cell is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    /// Equipment is under maintenance or retired
    EquipmentUnavailable,
    /// Slot lies outside the lab opening hours for that day
    OutsideLabHours,
    /// Weekend, holiday or closure date
    NonBookableDay,
    /// Day already passed
    Past,
}

impl std::fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ClosedReason::EquipmentUnavailable => "equipment is not active",
            ClosedReason::OutsideLabHours => "slot is outside lab hours",
            ClosedReason::NonBookableDay => "day is not bookable",
            ClosedReason::Past => "day has already passed",
        };
        write!(f, "{}", label)
    }
}

/// Availability of one slot template on one day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotAvailability {
    pub slot_template_id: i32,
    pub label: SlotLabel,
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "10:00")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "13:00")]
    pub end_time: NaiveTime,
    pub state: SlotState,
    /// Occupying bookings (pending, approved, completed)
    pub bookings_count: u32,
    pub capacity: u32,
    pub closed_reason: Option<ClosedReason>,
}

/// All slots of one day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

/// Seven days of availability, Monday first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeekAvailability {
    pub equipment_id: i32,
    pub week_start: NaiveDate,
    pub days: Vec<DayAvailability>,
}

impl WeekAvailability {
    pub fn cell(&self, date: NaiveDate, slot_template_id: i32) -> Option<&SlotAvailability> {
        self.days
            .iter()
            .find(|day| day.date == date)?
            .slots
            .iter()
            .find(|slot| slot.slot_template_id == slot_template_id)
    }

    pub fn cells(&self) -> impl Iterator<Item = (NaiveDate, &SlotAvailability)> {
        self.days
            .iter()
            .flat_map(|day| day.slots.iter().map(move |slot| (day.date, slot)))
    }
}

/// Availability query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AvailabilityQuery {
    /// Any day of the requested week (YYYY-MM-DD); defaults to the current week
    pub week_start: Option<NaiveDate>,
}
