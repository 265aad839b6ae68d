//! Equipment model

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::slot::{minute_ranges, CreateSlotTemplate, SlotTemplate};
use super::time_of_day;

/// Equipment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EquipmentStatus {
    Active,
    Maintenance,
    Retired,
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Active => "Active",
            EquipmentStatus::Maintenance => "Maintenance",
            EquipmentStatus::Retired => "Retired",
        };
        write!(f, "{}", label)
    }
}

/// Opening hours of the lab hosting an equipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LabHours {
    /// Opening time (HH:MM)
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "08:00")]
    pub opens_at: NaiveTime,
    /// Closing time (HH:MM); equal to opening time means around the clock
    #[serde(with = "time_of_day")]
    #[schema(value_type = String, example = "18:00")]
    pub closes_at: NaiveTime,
    /// Open days of week (0=Monday, 6=Sunday); empty means every day
    #[serde(default)]
    pub open_days: Vec<i16>,
}

impl LabHours {
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.open_days.is_empty()
            || self
                .open_days
                .contains(&(date.weekday().num_days_from_monday() as i16))
    }

    /// Whether the whole slot lies inside the opening window
    pub fn covers(&self, slot: &SlotTemplate) -> bool {
        let opens = self.opens_at.num_seconds_from_midnight() / 60;
        let closes = self.closes_at.num_seconds_from_midnight() / 60;
        let open_minutes = if closes > opens {
            closes - opens
        } else {
            closes + 24 * 60 - opens
        };
        let open = minute_ranges(self.opens_at, open_minutes);

        slot.minute_ranges().iter().all(|piece| {
            open.iter()
                .any(|window| window.start <= piece.start && piece.end <= window.end)
        })
    }
}

/// Details recorded while an equipment is under maintenance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceDetails {
    pub reason: String,
    pub expected_completion_date: NaiveDate,
    pub start_date: NaiveDate,
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub status: EquipmentStatus,
    /// Room or lab where the equipment is installed
    pub location: String,
    pub description: Option<String>,
    pub lab_hours: Option<LabHours>,
    pub maintenance: Option<MaintenanceDetails>,
    /// Active slot templates in creation order
    pub slot_templates: Vec<SlotTemplate>,
    pub crea_date: DateTime<Utc>,
    pub modif_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Equipment {
    pub fn is_bookable(&self) -> bool {
        self.status == EquipmentStatus::Active
    }

    /// Active slot template by id
    pub fn slot(&self, slot_id: i32) -> Option<&SlotTemplate> {
        self.slot_templates
            .iter()
            .find(|slot| slot.id == slot_id && slot.is_active())
    }

    pub fn active_slots(&self) -> impl Iterator<Item = &SlotTemplate> {
        self.slot_templates.iter().filter(|slot| slot.is_active())
    }

    /// Copy with soft-deleted slot templates stripped
    pub fn visible(&self) -> Equipment {
        let mut equipment = self.clone();
        equipment.slot_templates.retain(|slot| slot.is_active());
        equipment
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub description: Option<String>,
    pub lab_hours: Option<LabHours>,
    #[serde(default)]
    #[validate(nested)]
    pub slot_templates: Vec<CreateSlotTemplate>,
}

/// Update equipment request (status is changed through its own endpoint)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Location must not be empty"))]
    pub location: Option<String>,
    pub description: Option<String>,
    pub lab_hours: Option<LabHours>,
}

/// Maintenance details supplied when switching to maintenance
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MaintenanceRequest {
    pub reason: String,
    /// Expected completion date (YYYY-MM-DD), must be after today
    pub expected_completion_date: NaiveDate,
}

/// Status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetEquipmentStatus {
    pub status: EquipmentStatus,
    pub maintenance: Option<MaintenanceRequest>,
}

/// Sort keys for equipment lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentSort {
    Name,
    Location,
    Status,
}

/// Equipment query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Case-insensitive name fragment
    pub name: Option<String>,
    pub status: Option<EquipmentStatus>,
    /// Sort key; insertion order when absent
    pub sort: Option<EquipmentSort>,
}
