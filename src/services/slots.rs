//! Slot template store

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::Equipment,
        slot::{CreateSlotTemplate, SlotTemplate, UpdateSlotTemplate},
        user::Actor,
    },
    repository::Repository,
};

use super::{clock::Clock, equipment::require_staff, locks::LockTable};

/// First active template of `equipment`, other than `candidate`, sharing time with it
fn find_overlap(equipment: &Equipment, candidate: &SlotTemplate) -> AppResult<()> {
    match equipment
        .active_slots()
        .find(|other| other.id != candidate.id && other.overlaps(candidate))
    {
        Some(other) => Err(AppError::Overlap {
            equipment_id: equipment.id,
            conflicting_slot_id: other.id,
        }),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct SlotsService {
    repository: Repository,
    locks: Arc<LockTable>,
    clock: Arc<dyn Clock>,
}

impl SlotsService {
    pub fn new(repository: Repository, locks: Arc<LockTable>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            locks,
            clock,
        }
    }

    pub async fn add_slot(&self, actor: &Actor, equipment_id: i32, data: &CreateSlotTemplate) -> AppResult<SlotTemplate> {
        require_staff(actor)?;
        data.validate()?;

        let _gate = self.locks.equipment.exclusive(equipment_id).await;
        let equipment = self.repository.equipment.get_by_id(equipment_id)?;
        find_overlap(&equipment, &SlotTemplate::new(0, data))?;

        let slot = self
            .repository
            .equipment
            .add_slot(equipment_id, data, self.clock.now())?;
        tracing::info!(equipment_id, slot_id = slot.id, label = %slot.label, "Slot template added");
        Ok(slot)
    }

    pub async fn update_slot(
        &self,
        actor: &Actor,
        equipment_id: i32,
        slot_id: i32,
        patch: &UpdateSlotTemplate,
    ) -> AppResult<SlotTemplate> {
        require_staff(actor)?;
        patch.validate()?;

        let _gate = self.locks.equipment.exclusive(equipment_id).await;
        let equipment = self.repository.equipment.get_by_id(equipment_id)?;
        let mut slot = equipment
            .slot(slot_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        slot.apply(patch);
        find_overlap(&equipment, &slot)?;

        if let Some(capacity) = patch.max_concurrent_bookings {
            let peak = self
                .repository
                .bookings
                .peak_occupancy_from(equipment_id, slot_id, self.clock.today());
            if capacity < peak {
                return Err(AppError::Conflict(format!(
                    "Slot {} already holds {} bookings on one day, capacity cannot drop to {}",
                    slot_id, peak, capacity
                )));
            }
        }

        let slot = self
            .repository
            .equipment
            .replace_slot(equipment_id, slot, self.clock.now())?;
        tracing::info!(equipment_id, slot_id, "Slot template updated");
        Ok(slot)
    }

    pub async fn delete_slot(&self, actor: &Actor, equipment_id: i32, slot_id: i32) -> AppResult<()> {
        require_staff(actor)?;

        let _gate = self.locks.equipment.exclusive(equipment_id).await;
        let equipment = self.repository.equipment.get_by_id(equipment_id)?;
        if equipment.slot(slot_id).is_none() {
            return Err(AppError::NotFound(format!("Slot {} not found", slot_id)));
        }
        if self
            .repository
            .bookings
            .has_live_for_slot_from(equipment_id, slot_id, self.clock.today())
        {
            return Err(AppError::Conflict(format!(
                "Slot {} has upcoming pending or approved bookings",
                slot_id
            )));
        }

        self.repository
            .equipment
            .delete_slot(equipment_id, slot_id, self.clock.now())?;
        tracing::info!(equipment_id, slot_id, "Slot template deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use crate::models::slot::SlotLabel;
    use crate::services::fixtures::Fixture;

    fn night(start: u32, hours: u8) -> CreateSlotTemplate {
        CreateSlotTemplate {
            label: SlotLabel::Night,
            duration_hours: hours,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            usage_charge: Decimal::new(1250, 2),
            max_concurrent_bookings: 2,
        }
    }

    #[tokio::test]
    async fn test_add_slot_rejects_overlap() {
        let fx = Fixture::new();
        let slots = &fx.services.slots;

        let added = slots
            .add_slot(&fx.admin_actor(), fx.equipment.id, &night(23, 2))
            .await
            .unwrap();
        assert_eq!(added.end_time, NaiveTime::from_hms_opt(1, 0, 0).unwrap());

        // Wraps past midnight into the 23:00 slot
        let err = slots
            .add_slot(&fx.admin_actor(), fx.equipment.id, &night(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Overlap { conflicting_slot_id, .. } if conflicting_slot_id == added.id
        ));

        let err = slots
            .add_slot(&fx.admin_actor(), fx.equipment.id, &night(11, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Overlap { .. }));
    }

    #[tokio::test]
    async fn test_update_recomputes_end_and_checks_overlap() {
        let fx = Fixture::new();
        let slots = &fx.services.slots;
        let shared = fx.shared_slot();

        let updated = slots
            .update_slot(
                &fx.admin_actor(),
                fx.equipment.id,
                shared.id,
                &UpdateSlotTemplate {
                    duration_hours: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.end_time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());

        let err = slots
            .update_slot(
                &fx.admin_actor(),
                fx.equipment.id,
                shared.id,
                &UpdateSlotTemplate {
                    start_time: Some(NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Overlap { .. }));
    }

    #[tokio::test]
    async fn test_capacity_cannot_drop_below_bookings() {
        let fx = Fixture::new();
        let shared = fx.shared_slot();
        let day = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        fx.book(shared.id, day).await;
        fx.book_for(fx.other_student.id, shared.id, day).await;

        let lower = |max| UpdateSlotTemplate {
            max_concurrent_bookings: Some(max),
            ..Default::default()
        };
        let err = fx
            .services
            .slots
            .update_slot(&fx.admin_actor(), fx.equipment.id, shared.id, &lower(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let updated = fx
            .services
            .slots
            .update_slot(&fx.admin_actor(), fx.equipment.id, shared.id, &lower(2))
            .await
            .unwrap();
        assert_eq!(updated.max_concurrent_bookings, 2);
    }

    #[tokio::test]
    async fn test_delete_slot_with_upcoming_bookings() {
        let fx = Fixture::new();
        let single = fx.single_slot();
        let booking = fx
            .book(single.id, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            .await;

        let err = fx
            .services
            .slots
            .delete_slot(&fx.admin_actor(), fx.equipment.id, single.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        fx.services
            .bookings
            .reject(&fx.supervisor_actor(), booking.id, "Room closed")
            .await
            .unwrap();
        fx.services
            .slots
            .delete_slot(&fx.admin_actor(), fx.equipment.id, single.id)
            .await
            .unwrap();

        let equipment = fx.services.equipment.get(fx.equipment.id).await.unwrap();
        assert!(equipment.slot(single.id).is_none());
        assert!(matches!(
            fx.services
                .slots
                .delete_slot(&fx.admin_actor(), fx.equipment.id, single.id)
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}
