//! Equipment registry service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{
            CreateEquipment, Equipment, EquipmentQuery, EquipmentStatus, LabHours, MaintenanceDetails,
            SetEquipmentStatus, UpdateEquipment,
        },
        slot::SlotTemplate,
        user::Actor,
    },
    repository::Repository,
};

use super::{clock::Clock, locks::LockTable};

pub(crate) fn require_staff(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() || actor.is_supervisor() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Supervisor or administrator privileges required".to_string(),
        ))
    }
}

fn validate_lab_hours(lab_hours: &LabHours) -> AppResult<()> {
    if let Some(day) = lab_hours.open_days.iter().find(|d| !(0..=6).contains(*d)) {
        return Err(AppError::Validation(format!(
            "Open day {} is not a weekday (0=Monday to 6=Sunday)",
            day
        )));
    }
    Ok(())
}

fn non_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    locks: Arc<LockTable>,
    clock: Arc<dyn Clock>,
}

impl EquipmentService {
    pub fn new(repository: Repository, locks: Arc<LockTable>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            locks,
            clock,
        }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        Ok(self.repository.equipment.list(query))
    }

    pub async fn get(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id)
    }

    /// Register equipment with its initial slot templates
    pub async fn create(&self, actor: &Actor, data: &CreateEquipment) -> AppResult<Equipment> {
        require_staff(actor)?;
        data.validate()?;
        non_blank("Name", &data.name)?;
        non_blank("Location", &data.location)?;
        if let Some(ref lab_hours) = data.lab_hours {
            validate_lab_hours(lab_hours)?;
        }

        let slots: Vec<SlotTemplate> = data
            .slot_templates
            .iter()
            .enumerate()
            .map(|(i, slot)| SlotTemplate::new(i as i32, slot))
            .collect();
        for (i, slot) in slots.iter().enumerate() {
            if let Some(other) = slots[i + 1..].iter().find(|other| slot.overlaps(other)) {
                return Err(AppError::Validation(format!(
                    "Slot templates {} and {} overlap",
                    slot.id + 1,
                    other.id + 1
                )));
            }
        }

        let equipment = self.repository.equipment.create(data, self.clock.now());
        tracing::info!(
            equipment_id = equipment.id,
            name = %equipment.name,
            slots = equipment.slot_templates.len(),
            "Equipment created"
        );
        Ok(equipment)
    }

    /// Update descriptive fields; the status has its own operation
    pub async fn update(&self, actor: &Actor, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        require_staff(actor)?;
        data.validate()?;
        if let Some(ref name) = data.name {
            non_blank("Name", name)?;
        }
        if let Some(ref location) = data.location {
            non_blank("Location", location)?;
        }
        if let Some(ref lab_hours) = data.lab_hours {
            validate_lab_hours(lab_hours)?;
        }

        let _gate = self.locks.equipment.exclusive(id).await;
        self.repository.equipment.update(id, data, self.clock.now())
    }

    /// Change status; maintenance needs a reason and a future completion date
    pub async fn set_status(&self, actor: &Actor, id: i32, data: &SetEquipmentStatus) -> AppResult<Equipment> {
        require_staff(actor)?;
        let today = self.clock.today();

        let maintenance = match data.status {
            EquipmentStatus::Maintenance => {
                let request = data.maintenance.as_ref().ok_or_else(|| {
                    AppError::Validation("Maintenance details are required".to_string())
                })?;
                let reason = request.reason.trim();
                if reason.is_empty() {
                    return Err(AppError::Validation("A maintenance reason is required".to_string()));
                }
                if request.expected_completion_date <= today {
                    return Err(AppError::Validation(
                        "Expected completion date must be after today".to_string(),
                    ));
                }
                Some(MaintenanceDetails {
                    reason: reason.to_string(),
                    expected_completion_date: request.expected_completion_date,
                    start_date: today,
                })
            }
            EquipmentStatus::Active | EquipmentStatus::Retired => None,
        };

        let _gate = self.locks.equipment.exclusive(id).await;
        let equipment = self
            .repository
            .equipment
            .set_status(id, data.status, maintenance, self.clock.now())?;

        tracing::info!(equipment_id = id, status = %equipment.status, "Equipment status changed");
        Ok(equipment)
    }

    /// Soft-delete equipment without pending or approved bookings
    pub async fn remove(&self, actor: &Actor, id: i32) -> AppResult<()> {
        require_staff(actor)?;
        let _gate = self.locks.equipment.exclusive(id).await;
        self.repository.equipment.get_by_id(id)?;
        if self.repository.bookings.has_live_for_equipment(id) {
            return Err(AppError::Conflict(format!(
                "Equipment {} still has pending or approved bookings",
                id
            )));
        }
        self.repository.equipment.delete(id, self.clock.now())?;
        tracing::info!(equipment_id = id, "Equipment removed");
        Ok(())
    }
}
