//! Booking ledger table

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, BookingQuery, SlotKey},
};

#[derive(Default)]
struct BookingsTable {
    next_id: i32,
    rows: IndexMap<i32, Booking>,
    by_slot: HashMap<SlotKey, Vec<i32>>,
}

impl BookingsTable {
    fn for_key(&self, key: &SlotKey) -> impl Iterator<Item = &Booking> {
        self.by_slot
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rows.get(id))
    }
}

#[derive(Clone, Default)]
pub struct BookingsRepository {
    table: Arc<RwLock<BookingsTable>>,
}

impl BookingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get booking by ID
    pub fn get_by_id(&self, id: i32) -> AppResult<Booking> {
        self.table
            .read()
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    /// Bookings matching the query, ordered by day then start time
    pub fn list(&self, query: &BookingQuery) -> Vec<Booking> {
        let mut rows: Vec<Booking> = self
            .table
            .read()
            .rows
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.date, b.start_time, b.id));
        rows
    }

    /// Occupying bookings of one calendar cell
    pub fn count_occupying(&self, key: &SlotKey) -> u32 {
        self.table
            .read()
            .for_key(key)
            .filter(|b| b.status.is_occupying())
            .count() as u32
    }

    /// Occupying bookings per `(date, slot)` of an equipment within `[from, to]`
    pub fn occupancy(&self, equipment_id: i32, from: NaiveDate, to: NaiveDate) -> HashMap<(NaiveDate, i32), u32> {
        let table = self.table.read();
        let mut counts = HashMap::new();
        for (key, ids) in table.by_slot.iter() {
            if key.equipment_id != equipment_id || key.date < from || key.date > to {
                continue;
            }
            let occupying = ids
                .iter()
                .filter_map(|id| table.rows.get(id))
                .filter(|b| b.status.is_occupying())
                .count() as u32;
            counts.insert((key.date, key.slot_id), occupying);
        }
        counts
    }

    /// Whether a pending or approved booking references the equipment
    pub fn has_live_for_equipment(&self, equipment_id: i32) -> bool {
        self.table
            .read()
            .rows
            .values()
            .any(|b| b.equipment_id == equipment_id && b.status.is_live())
    }

    /// Whether a pending or approved booking dated `from` or later references the slot
    pub fn has_live_for_slot_from(&self, equipment_id: i32, slot_id: i32, from: NaiveDate) -> bool {
        self.table.read().rows.values().any(|b| {
            b.equipment_id == equipment_id
                && b.slot_template_id == slot_id
                && b.date >= from
                && b.status.is_live()
        })
    }

    /// Highest occupying count of the slot over days `from` or later
    pub fn peak_occupancy_from(&self, equipment_id: i32, slot_id: i32, from: NaiveDate) -> u32 {
        let table = self.table.read();
        table
            .by_slot
            .iter()
            .filter(|(key, _)| {
                key.equipment_id == equipment_id && key.slot_id == slot_id && key.date >= from
            })
            .map(|(key, _)| {
                table
                    .for_key(key)
                    .filter(|b| b.status.is_occupying())
                    .count() as u32
            })
            .max()
            .unwrap_or(0)
    }

    /// Insert a booking, assigning its ID
    pub fn create(&self, mut booking: Booking) -> Booking {
        let mut table = self.table.write();
        table.next_id += 1;
        booking.id = table.next_id;
        table
            .by_slot
            .entry(booking.key())
            .or_default()
            .push(booking.id);
        table.rows.insert(booking.id, booking.clone());
        booking
    }

    /// Mutate a booking in place; nothing is written when `apply` fails
    pub fn update<F>(&self, id: i32, apply: F) -> AppResult<Booking>
    where
        F: FnOnce(&mut Booking) -> AppResult<()>,
    {
        let mut table = self.table.write();
        let current = table
            .rows
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        let mut updated = current.clone();
        apply(&mut updated)?;
        table.rows.insert(id, updated.clone());
        Ok(updated)
    }
}
