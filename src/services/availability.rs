//! Availability resolver: slot templates + ledger + calendar -> week grid

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::{
        availability::{ClosedReason, DayAvailability, SlotAvailability, SlotState, WeekAvailability},
        booking::SlotKey,
        equipment::Equipment,
        slot::SlotTemplate,
    },
    repository::Repository,
};

use super::{calendar::BookingCalendar, clock::Clock};

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// State of one cell, given the facts gathered for it
pub fn resolve_cell(
    equipment: &Equipment,
    slot: &SlotTemplate,
    date: NaiveDate,
    day_bookable: bool,
    bookings_count: u32,
    today: NaiveDate,
) -> SlotAvailability {
    let closed_reason = if !equipment.is_bookable() {
        Some(ClosedReason::EquipmentUnavailable)
    } else if date < today {
        Some(ClosedReason::Past)
    } else if !day_bookable {
        Some(ClosedReason::NonBookableDay)
    } else if equipment
        .lab_hours
        .as_ref()
        .is_some_and(|hours| !hours.is_open_on(date) || !hours.covers(slot))
    {
        Some(ClosedReason::OutsideLabHours)
    } else {
        None
    };

    let capacity = slot.max_concurrent_bookings;
    let state = match closed_reason {
        Some(_) => SlotState::Closed,
        None if bookings_count >= capacity => SlotState::Full,
        None => SlotState::Available,
    };

    SlotAvailability {
        slot_template_id: slot.id,
        label: slot.label,
        start_time: slot.start_time,
        end_time: slot.end_time,
        state,
        bookings_count,
        capacity,
        closed_reason,
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
    calendar: Arc<dyn BookingCalendar>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(repository: Repository, calendar: Arc<dyn BookingCalendar>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            calendar,
            clock,
        }
    }

    pub fn calendar(&self) -> &Arc<dyn BookingCalendar> {
        &self.calendar
    }

    /// Availability of every active slot over the week containing `date`
    pub async fn resolve_week(&self, equipment_id: i32, date: NaiveDate) -> AppResult<WeekAvailability> {
        let monday = week_start(date);
        let days: Vec<NaiveDate> = (0..7).map(|i| monday + Duration::days(i)).collect();

        let mut bookable = HashSet::new();
        for day in &days {
            if self.calendar.is_bookable(*day).await {
                bookable.insert(*day);
            }
        }

        let equipment = self.repository.equipment.get_by_id(equipment_id)?;
        let occupancy = self
            .repository
            .bookings
            .occupancy(equipment_id, monday, monday + Duration::days(6));
        let today = self.clock.today();

        let days = days
            .into_iter()
            .map(|day| DayAvailability {
                date: day,
                slots: equipment
                    .active_slots()
                    .map(|slot| {
                        let count = occupancy.get(&(day, slot.id)).copied().unwrap_or(0);
                        resolve_cell(&equipment, slot, day, bookable.contains(&day), count, today)
                    })
                    .collect(),
            })
            .collect();

        tracing::debug!(equipment_id, week_start = %monday, "Week availability resolved");

        Ok(WeekAvailability {
            equipment_id,
            week_start: monday,
            days,
        })
    }

    /// Availability of a single `(date, slot)` cell
    pub async fn resolve_slot(&self, equipment_id: i32, slot_id: i32, date: NaiveDate) -> AppResult<SlotAvailability> {
        let day_bookable = self.calendar.is_bookable(date).await;

        let equipment = self.repository.equipment.get_by_id(equipment_id)?;
        let slot = equipment.slot(slot_id).ok_or_else(|| {
            AppError::NotFound(format!("Slot {} of equipment {} not found", slot_id, equipment_id))
        })?;
        let count = self.repository.bookings.count_occupying(&SlotKey {
            equipment_id,
            slot_id,
            date,
        });

        Ok(resolve_cell(&equipment, slot, date, day_bookable, count, self.clock.today()))
    }

    /// Availability of the week containing today
    pub async fn resolve_current_week(&self, equipment_id: i32) -> AppResult<WeekAvailability> {
        self.resolve_week(equipment_id, self.clock.today()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;

    use crate::models::{
        booking::{Booking, BookingStatus},
        equipment::{CreateEquipment, EquipmentStatus, LabHours},
        slot::{CreateSlotTemplate, SlotLabel},
    };
    use crate::services::calendar::MockBookingCalendar;
    use crate::services::clock::FixedClock;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn open_calendar() -> Arc<dyn BookingCalendar> {
        let mut calendar = MockBookingCalendar::new();
        calendar.expect_is_bookable().returning(|_| true);
        Arc::new(calendar)
    }

    fn setup(calendar: Arc<dyn BookingCalendar>) -> (Repository, AvailabilityService, Equipment) {
        let repository = Repository::new();
        let equipment = repository.equipment.create(
            &CreateEquipment {
                name: "Microscope Pro X1".to_string(),
                location: "Lab A - Room 101".to_string(),
                description: None,
                lab_hours: Some(LabHours {
                    opens_at: time(8),
                    closes_at: time(18),
                    open_days: vec![],
                }),
                slot_templates: vec![
                    CreateSlotTemplate {
                        label: SlotLabel::Day,
                        duration_hours: 3,
                        start_time: time(10),
                        usage_charge: Decimal::from(35),
                        max_concurrent_bookings: 1,
                    },
                    CreateSlotTemplate {
                        label: SlotLabel::Night,
                        duration_hours: 2,
                        start_time: time(20),
                        usage_charge: Decimal::from(10),
                        max_concurrent_bookings: 2,
                    },
                ],
            },
            chrono::Utc::now(),
        );
        let clock = Arc::new(FixedClock::at_date(date(1)));
        let service = AvailabilityService::new(repository.clone(), calendar, clock);
        (repository, service, equipment)
    }

    fn book(repository: &Repository, equipment: &Equipment, slot_id: i32, day: NaiveDate, status: BookingStatus) {
        let slot = equipment.slot(slot_id).unwrap();
        repository.bookings.create(Booking {
            id: 0,
            equipment_id: equipment.id,
            slot_template_id: slot_id,
            student_id: 1,
            supervisor_id: 2,
            date: day,
            status,
            cost: slot.usage_charge,
            slot_label: slot.label,
            start_time: slot.start_time,
            end_time: slot.end_time,
            notes: None,
            created_at: chrono::Utc::now(),
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
        });
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(date(12)), date(10));
        assert_eq!(week_start(date(10)), date(10));
        assert_eq!(week_start(date(16)), date(10));
    }

    #[tokio::test]
    async fn test_grid_covers_seven_days_of_active_slots() {
        let (_, service, equipment) = setup(open_calendar());
        let week = service.resolve_week(equipment.id, date(12)).await.unwrap();

        assert_eq!(week.week_start, date(10));
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.cells().count(), 14);
    }

    #[tokio::test]
    async fn test_full_when_capacity_reached() {
        let (repository, service, equipment) = setup(open_calendar());
        let day_slot = equipment.slot_templates[0].id;
        book(&repository, &equipment, day_slot, date(10), BookingStatus::Pending);
        book(&repository, &equipment, day_slot, date(11), BookingStatus::Rejected);

        let week = service.resolve_week(equipment.id, date(10)).await.unwrap();
        let monday = week.cell(date(10), day_slot).unwrap();
        assert_eq!(monday.state, SlotState::Full);
        assert_eq!(monday.bookings_count, 1);

        let tuesday = week.cell(date(11), day_slot).unwrap();
        assert_eq!(tuesday.state, SlotState::Available);
        assert_eq!(tuesday.bookings_count, 0);
    }

    #[tokio::test]
    async fn test_outside_lab_hours_is_closed() {
        let (_, service, equipment) = setup(open_calendar());
        let night_slot = equipment.slot_templates[1].id;
        let week = service.resolve_week(equipment.id, date(10)).await.unwrap();
        let cell = week.cell(date(10), night_slot).unwrap();
        assert_eq!(cell.state, SlotState::Closed);
        assert_eq!(cell.closed_reason, Some(ClosedReason::OutsideLabHours));
    }

    #[tokio::test]
    async fn test_calendar_closes_days() {
        let mut calendar = MockBookingCalendar::new();
        calendar
            .expect_is_bookable()
            .returning(|day| day.weekday().num_days_from_monday() < 5);
        let (_, service, equipment) = setup(Arc::new(calendar));
        let day_slot = equipment.slot_templates[0].id;

        let week = service.resolve_week(equipment.id, date(10)).await.unwrap();
        assert_eq!(week.cell(date(14), day_slot).unwrap().state, SlotState::Available);
        let saturday = week.cell(date(15), day_slot).unwrap();
        assert_eq!(saturday.state, SlotState::Closed);
        assert_eq!(saturday.closed_reason, Some(ClosedReason::NonBookableDay));
    }

    #[tokio::test]
    async fn test_past_days_are_closed() {
        let (_, service, equipment) = setup(open_calendar());
        let day_slot = equipment.slot_templates[0].id;
        // Clock is at 2024-06-01 (a Saturday); the week starts on 2024-05-27
        let week = service.resolve_week(equipment.id, date(1)).await.unwrap();
        assert_eq!(week.week_start, NaiveDate::from_ymd_opt(2024, 5, 27).unwrap());
        let friday = week.cell(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(), day_slot).unwrap();
        assert_eq!(friday.closed_reason, Some(ClosedReason::Past));
        assert_eq!(week.cell(date(1), day_slot).unwrap().state, SlotState::Available);
    }

    #[tokio::test]
    async fn test_maintenance_closes_every_cell() {
        let (repository, service, equipment) = setup(open_calendar());
        let day_slot = equipment.slot_templates[0].id;
        book(&repository, &equipment, day_slot, date(10), BookingStatus::Approved);
        repository
            .equipment
            .set_status(equipment.id, EquipmentStatus::Maintenance, None, chrono::Utc::now())
            .unwrap();

        let week = service.resolve_week(equipment.id, date(10)).await.unwrap();
        assert!(week.cells().all(|(_, cell)| cell.state == SlotState::Closed));
        assert!(week
            .cells()
            .all(|(_, cell)| cell.closed_reason == Some(ClosedReason::EquipmentUnavailable)));
        assert_eq!(week.cell(date(10), day_slot).unwrap().bookings_count, 1);
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let (repository, service, equipment) = setup(open_calendar());
        let day_slot = equipment.slot_templates[0].id;
        book(&repository, &equipment, day_slot, date(12), BookingStatus::Approved);

        let first = service.resolve_week(equipment.id, date(10)).await.unwrap();
        let second = service.resolve_week(equipment.id, date(10)).await.unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
