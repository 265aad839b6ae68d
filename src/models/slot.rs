//! Slot template model (recurring bookable windows of an equipment)

use std::ops::Range;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::time_of_day;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Slot label shown in the booking calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SlotLabel {
    #[serde(rename = "Early Morning")]
    EarlyMorning,
    Day,
    Evening,
    Night,
}

impl std::fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SlotLabel::EarlyMorning => "Early Morning",
            SlotLabel::Day => "Day",
            SlotLabel::Evening => "Evening",
            SlotLabel::Night => "Night",
        };
        write!(f, "{}", label)
    }
}

/// A recurring bookable time window owned by one equipment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotTemplate {
    pub id: i32,
    pub label: SlotLabel,
    /// Duration in hours (1, 2 or 3)
    pub duration_hours: u8,
    /// Start time (HH:MM)
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "10:00")]
    pub start_time: NaiveTime,
    /// End time (HH:MM), always start time + duration, wrapping at midnight
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "13:00")]
    pub end_time: NaiveTime,
    /// Charge debited for one booking of this slot
    #[schema(value_type = String, example = "35.00")]
    pub usage_charge: Decimal,
    pub max_concurrent_bookings: u32,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SlotTemplate {
    pub fn new(id: i32, data: &CreateSlotTemplate) -> Self {
        Self {
            id,
            label: data.label,
            duration_hours: data.duration_hours,
            start_time: data.start_time,
            end_time: end_time(data.start_time, data.duration_hours),
            usage_charge: data.usage_charge,
            max_concurrent_bookings: data.max_concurrent_bookings,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Minute-of-day ranges covered by this slot, split at midnight
    pub fn minute_ranges(&self) -> Vec<Range<u32>> {
        minute_ranges(self.start_time, u32::from(self.duration_hours) * 60)
    }

    pub fn overlaps(&self, other: &SlotTemplate) -> bool {
        ranges_intersect(&self.minute_ranges(), &other.minute_ranges())
    }

    /// Apply a patch, recomputing the end time
    pub fn apply(&mut self, patch: &UpdateSlotTemplate) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(duration_hours) = patch.duration_hours {
            self.duration_hours = duration_hours;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(usage_charge) = patch.usage_charge {
            self.usage_charge = usage_charge;
        }
        if let Some(max) = patch.max_concurrent_bookings {
            self.max_concurrent_bookings = max;
        }
        self.end_time = end_time(self.start_time, self.duration_hours);
    }
}

/// `start + hours`, wrapping within the day
pub fn end_time(start: NaiveTime, duration_hours: u8) -> NaiveTime {
    let (end, _) = start.overflowing_add_signed(Duration::hours(i64::from(duration_hours)));
    end
}

/// Minute-of-day ranges of a window of `minutes` starting at `start`
pub fn minute_ranges(start: NaiveTime, minutes: u32) -> Vec<Range<u32>> {
    if minutes >= MINUTES_PER_DAY {
        return vec![0..MINUTES_PER_DAY];
    }
    let begin = start.num_seconds_from_midnight() / 60;
    let end = begin + minutes;
    if end <= MINUTES_PER_DAY {
        vec![begin..end]
    } else {
        vec![begin..MINUTES_PER_DAY, 0..end - MINUTES_PER_DAY]
    }
}

pub fn ranges_intersect(a: &[Range<u32>], b: &[Range<u32>]) -> bool {
    a.iter()
        .any(|x| b.iter().any(|y| x.start < y.end && y.start < x.end))
}

pub(crate) fn validate_charge(charge: &Decimal) -> Result<(), ValidationError> {
    if charge.is_sign_negative() && !charge.is_zero() {
        return Err(ValidationError::new("negative_charge")
            .with_message("Usage charge must not be negative".into()));
    }
    Ok(())
}

/// Create slot template request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSlotTemplate {
    pub label: SlotLabel,
    #[validate(range(min = 1, max = 3, message = "Duration must be 1, 2 or 3 hours"))]
    pub duration_hours: u8,
    /// Start time (HH:MM)
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "10:00")]
    pub start_time: NaiveTime,
    #[validate(custom(function = "validate_charge"))]
    #[schema(value_type = String, example = "35.00")]
    pub usage_charge: Decimal,
    #[validate(range(min = 1, message = "At least one concurrent booking is required"))]
    pub max_concurrent_bookings: u32,
}

/// Update slot template request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSlotTemplate {
    pub label: Option<SlotLabel>,
    #[validate(range(min = 1, max = 3, message = "Duration must be 1, 2 or 3 hours"))]
    pub duration_hours: Option<u8>,
    /// Start time (HH:MM)
    #[serde(default, with = "time_of_day::option")]
    #[schema(value_type = Option<String>, example = "10:00")]
    pub start_time: Option<NaiveTime>,
    #[validate(custom(function = "validate_charge"))]
    #[schema(value_type = Option<String>, example = "35.00")]
    pub usage_charge: Option<Decimal>,
    #[validate(range(min = 1, message = "At least one concurrent booking is required"))]
    pub max_concurrent_bookings: Option<u32>,
}
