//! Equipment and slot template tables

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{
            CreateEquipment, Equipment, EquipmentQuery, EquipmentSort, EquipmentStatus,
            MaintenanceDetails, UpdateEquipment,
        },
        slot::{CreateSlotTemplate, SlotTemplate},
    },
};

#[derive(Default)]
struct EquipmentTable {
    next_id: i32,
    next_slot_id: i32,
    rows: IndexMap<i32, Equipment>,
}

impl EquipmentTable {
    fn live_mut(&mut self, id: i32) -> AppResult<&mut Equipment> {
        self.rows
            .get_mut(&id)
            .filter(|e| e.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    fn slot_id(&mut self) -> i32 {
        self.next_slot_id += 1;
        self.next_slot_id
    }
}

#[derive(Clone, Default)]
pub struct EquipmentRepository {
    table: Arc<RwLock<EquipmentTable>>,
}

impl EquipmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// List equipment, insertion order unless a sort key is given
    pub fn list(&self, query: &EquipmentQuery) -> Vec<Equipment> {
        let needle = query.name.as_ref().map(|n| n.to_lowercase());
        let table = self.table.read();

        let mut rows: Vec<Equipment> = table
            .rows
            .values()
            .filter(|e| e.deleted_at.is_none())
            .filter(|e| {
                needle
                    .as_ref()
                    .map_or(true, |n| e.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|e| query.status.map_or(true, |s| e.status == s))
            .map(Equipment::visible)
            .collect();

        match query.sort {
            Some(EquipmentSort::Name) => {
                rows.sort_by_key(|e| e.name.to_lowercase());
            }
            Some(EquipmentSort::Location) => {
                rows.sort_by_key(|e| e.location.to_lowercase());
            }
            Some(EquipmentSort::Status) => {
                rows.sort_by_key(|e| e.status.to_string());
            }
            None => {}
        }
        rows
    }

    /// Get equipment by ID (soft-deleted slots stripped)
    pub fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.table
            .read()
            .rows
            .get(&id)
            .filter(|e| e.deleted_at.is_none())
            .map(Equipment::visible)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create equipment with its initial slot templates
    pub fn create(&self, data: &CreateEquipment, now: DateTime<Utc>) -> Equipment {
        let mut table = self.table.write();
        table.next_id += 1;
        let id = table.next_id;

        let slot_templates = data
            .slot_templates
            .iter()
            .map(|slot| {
                let slot_id = table.slot_id();
                SlotTemplate::new(slot_id, slot)
            })
            .collect();

        let equipment = Equipment {
            id,
            name: data.name.trim().to_string(),
            status: EquipmentStatus::Active,
            location: data.location.trim().to_string(),
            description: data.description.clone(),
            lab_hours: data.lab_hours.clone(),
            maintenance: None,
            slot_templates,
            crea_date: now,
            modif_date: None,
            deleted_at: None,
        };
        table.rows.insert(id, equipment.clone());
        equipment
    }

    /// Update descriptive fields
    pub fn update(&self, id: i32, data: &UpdateEquipment, now: DateTime<Utc>) -> AppResult<Equipment> {
        let mut table = self.table.write();
        let equipment = table.live_mut(id)?;

        if let Some(ref name) = data.name {
            equipment.name = name.trim().to_string();
        }
        if let Some(ref location) = data.location {
            equipment.location = location.trim().to_string();
        }
        if let Some(ref description) = data.description {
            equipment.description = Some(description.clone());
        }
        if let Some(ref lab_hours) = data.lab_hours {
            equipment.lab_hours = Some(lab_hours.clone());
        }
        equipment.modif_date = Some(now);
        Ok(equipment.visible())
    }

    pub fn set_status(
        &self,
        id: i32,
        status: EquipmentStatus,
        maintenance: Option<MaintenanceDetails>,
        now: DateTime<Utc>,
    ) -> AppResult<Equipment> {
        let mut table = self.table.write();
        let equipment = table.live_mut(id)?;
        equipment.status = status;
        equipment.maintenance = maintenance;
        equipment.modif_date = Some(now);
        Ok(equipment.visible())
    }

    /// Soft-delete equipment and all of its slot templates
    pub fn delete(&self, id: i32, now: DateTime<Utc>) -> AppResult<()> {
        let mut table = self.table.write();
        let equipment = table.live_mut(id)?;
        equipment.deleted_at = Some(now);
        for slot in equipment.slot_templates.iter_mut() {
            if slot.deleted_at.is_none() {
                slot.deleted_at = Some(now);
            }
        }
        Ok(())
    }

    pub fn add_slot(
        &self,
        equipment_id: i32,
        data: &CreateSlotTemplate,
        now: DateTime<Utc>,
    ) -> AppResult<SlotTemplate> {
        let mut table = self.table.write();
        table.live_mut(equipment_id)?;
        let slot = SlotTemplate::new(table.slot_id(), data);
        let equipment = table.live_mut(equipment_id)?;
        equipment.slot_templates.push(slot.clone());
        equipment.modif_date = Some(now);
        Ok(slot)
    }

    /// Replace an active slot template
    pub fn replace_slot(
        &self,
        equipment_id: i32,
        slot: SlotTemplate,
        now: DateTime<Utc>,
    ) -> AppResult<SlotTemplate> {
        let mut table = self.table.write();
        let equipment = table.live_mut(equipment_id)?;
        let current = equipment
            .slot_templates
            .iter_mut()
            .find(|s| s.id == slot.id && s.is_active())
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot.id)))?;
        *current = slot.clone();
        equipment.modif_date = Some(now);
        Ok(slot)
    }

    pub fn delete_slot(&self, equipment_id: i32, slot_id: i32, now: DateTime<Utc>) -> AppResult<()> {
        let mut table = self.table.write();
        let equipment = table.live_mut(equipment_id)?;
        let slot = equipment
            .slot_templates
            .iter_mut()
            .find(|s| s.id == slot_id && s.is_active())
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        slot.deleted_at = Some(now);
        equipment.modif_date = Some(now);
        Ok(())
    }
}
