//! Booking ledger: requests, decisions and the booking lifecycle

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        availability::SlotState,
        booking::{Booking, BookingQuery, BookingStatus, CreateBooking, SlotKey},
        user::{Actor, Role, User},
    },
    repository::Repository,
};

use super::{
    availability::AvailabilityService,
    clock::Clock,
    locks::{KeyedMutexGuard, LockTable},
};

/// Fail unless `booking` is in `expected`
fn ensure_status(booking: &Booking, expected: BookingStatus, action: &'static str) -> AppResult<()> {
    if booking.status == expected {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            booking_id: booking.id,
            status: booking.status,
            action,
        })
    }
}

/// Admins decide on every booking, supervisors on the ones charged to them
fn ensure_decider(actor: &Actor, booking: &Booking) -> AppResult<()> {
    if actor.is_admin() || (actor.is_supervisor() && booking.supervisor_id == actor.user_id) {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "Booking {} is not under your supervision",
            booking.id
        )))
    }
}

fn ensure_viewer(actor: &Actor, booking: &Booking) -> AppResult<()> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Supervisor => booking.supervisor_id == actor.user_id,
        Role::Student => booking.student_id == actor.user_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Authorization(format!("Booking {} is not yours", booking.id)))
    }
}

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    availability: AvailabilityService,
    locks: Arc<LockTable>,
    clock: Arc<dyn Clock>,
}

impl BookingsService {
    pub fn new(
        repository: Repository,
        availability: AvailabilityService,
        locks: Arc<LockTable>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            availability,
            locks,
            clock,
        }
    }

    /// Get a booking visible to the caller
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<Booking> {
        let booking = self.repository.bookings.get_by_id(id)?;
        ensure_viewer(actor, &booking)?;
        Ok(booking)
    }

    /// List bookings, narrowed to what the caller may see
    pub async fn list(&self, actor: &Actor, mut query: BookingQuery) -> AppResult<Vec<Booking>> {
        match actor.role {
            Role::Admin => {}
            Role::Supervisor => {
                if query.supervisor_id.is_some_and(|id| id != actor.user_id) {
                    return Err(AppError::Authorization(
                        "Supervisors can only list their own bookings".to_string(),
                    ));
                }
                query.supervisor_id = Some(actor.user_id);
            }
            Role::Student => {
                if query.student_id.is_some_and(|id| id != actor.user_id) {
                    return Err(AppError::Authorization(
                        "Students can only list their own bookings".to_string(),
                    ));
                }
                query.student_id = Some(actor.user_id);
            }
        }
        Ok(self.repository.bookings.list(&query))
    }

    /// The student of a request and the supervisor it is charged to
    fn assignment(&self, actor: &Actor, data: &CreateBooking) -> AppResult<(User, i32)> {
        let student = self
            .repository
            .users
            .get_by_id(data.student_id)
            .ok()
            .filter(|u| u.role == Role::Student)
            .ok_or_else(|| AppError::Validation(format!("Student {} does not exist", data.student_id)))?;
        let assigned = student.supervisor_id.ok_or_else(|| {
            AppError::Validation(format!("Student {} has no supervisor", student.id))
        })?;
        let supervisor_id = data.supervisor_id.unwrap_or(assigned);
        if supervisor_id != assigned {
            return Err(AppError::Validation(format!(
                "Student {} is not assigned to supervisor {}",
                student.id, supervisor_id
            )));
        }
        if actor.is_supervisor() && actor.user_id != supervisor_id {
            return Err(AppError::Authorization(format!(
                "Student {} is not under your supervision",
                student.id
            )));
        }
        Ok((student, supervisor_id))
    }

    /// Lock an existing booking and read it again under the lock
    async fn lock_booking(&self, id: i32) -> AppResult<(KeyedMutexGuard<i32>, Booking)> {
        self.repository.bookings.get_by_id(id)?;
        let guard = self.locks.bookings.lock(id).await;
        let booking = self.repository.bookings.get_by_id(id)?;
        Ok((guard, booking))
    }

    /// Request a slot for a student; the booking starts pending
    pub async fn request(&self, actor: &Actor, data: &CreateBooking) -> AppResult<Booking> {
        data.validate()?;
        if !(actor.is_admin() || actor.is_supervisor()) {
            return Err(AppError::Authorization(
                "Bookings are requested by a supervisor".to_string(),
            ));
        }

        // Cheap rejection of unknown students, equipment and slots before any lock is taken
        self.assignment(actor, data)?;
        self.repository
            .equipment
            .get_by_id(data.equipment_id)?
            .slot(data.slot_template_id)
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", data.slot_template_id)))?;

        let key = SlotKey {
            equipment_id: data.equipment_id,
            slot_id: data.slot_template_id,
            date: data.date,
        };
        let _gate = self.locks.equipment.shared(key.equipment_id).await;
        let _slot = self.locks.slots.lock(key).await;
        let _student = self.locks.students.lock(data.student_id).await;

        // The student may have been transferred while we waited
        let (student, supervisor_id) = self.assignment(actor, data)?;

        let cell = self
            .availability
            .resolve_slot(key.equipment_id, key.slot_id, key.date)
            .await?;
        match cell.state {
            SlotState::Closed => {
                let reason = cell
                    .closed_reason
                    .map(|r| r.to_string())
                    .unwrap_or_default();
                return Err(AppError::NotBookable(format!(
                    "Slot {} of equipment {} is closed on {}: {}",
                    key.slot_id, key.equipment_id, key.date, reason
                )));
            }
            SlotState::Full => {
                return Err(AppError::Capacity {
                    equipment_id: key.equipment_id,
                    slot_id: key.slot_id,
                    date: key.date,
                    capacity: cell.capacity,
                });
            }
            SlotState::Available => {}
        }

        let equipment = self.repository.equipment.get_by_id(key.equipment_id)?;
        let slot = equipment
            .slot(key.slot_id)
            .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", key.slot_id)))?;

        let booking = self.repository.bookings.create(Booking {
            id: 0,
            equipment_id: key.equipment_id,
            slot_template_id: key.slot_id,
            student_id: student.id,
            supervisor_id,
            date: key.date,
            status: BookingStatus::Pending,
            cost: slot.usage_charge,
            slot_label: slot.label,
            start_time: slot.start_time,
            end_time: slot.end_time,
            notes: data.notes.clone(),
            created_at: self.clock.now(),
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
        });

        tracing::info!(
            booking_id = booking.id,
            equipment_id = booking.equipment_id,
            slot_id = booking.slot_template_id,
            date = %booking.date,
            student_id = booking.student_id,
            "Booking requested"
        );
        Ok(booking)
    }

    /// Approve a pending booking, debiting its cost from the supervisor account
    pub async fn approve(&self, actor: &Actor, id: i32) -> AppResult<Booking> {
        let (_booking_guard, booking) = self.lock_booking(id).await?;
        ensure_decider(actor, &booking)?;
        ensure_status(&booking, BookingStatus::Pending, "approve")?;

        let _account_guard = self.locks.supervisors.lock(booking.supervisor_id).await;
        let now = self.clock.now();
        let account = self.repository.credits.debit(
            booking.supervisor_id,
            booking.student_id,
            booking.cost,
            booking.id,
            now,
        )?;

        let approved = self.repository.bookings.update(id, |b| {
            ensure_status(b, BookingStatus::Pending, "approve")?;
            b.status = BookingStatus::Approved;
            b.decided_at = Some(now);
            b.decided_by = Some(actor.user_id);
            Ok(())
        });
        let approved = match approved {
            Ok(approved) => approved,
            Err(e) => {
                self.repository.credits.refund(
                    booking.supervisor_id,
                    booking.student_id,
                    booking.cost,
                    booking.id,
                    now,
                )?;
                return Err(e);
            }
        };

        tracing::info!(
            booking_id = id,
            supervisor_id = approved.supervisor_id,
            cost = %approved.cost,
            balance = %account.balance,
            "Booking approved"
        );
        Ok(approved)
    }

    /// Reject a pending booking
    pub async fn reject(&self, actor: &Actor, id: i32, reason: &str) -> AppResult<Booking> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("A rejection reason is required".to_string()));
        }

        let (_booking_guard, booking) = self.lock_booking(id).await?;
        ensure_decider(actor, &booking)?;

        let now = self.clock.now();
        let rejected = self.repository.bookings.update(id, |b| {
            ensure_status(b, BookingStatus::Pending, "reject")?;
            b.status = BookingStatus::Rejected;
            b.decided_at = Some(now);
            b.decided_by = Some(actor.user_id);
            b.rejection_reason = Some(reason.to_string());
            Ok(())
        })?;

        tracing::info!(booking_id = id, reason, "Booking rejected");
        Ok(rejected)
    }

    /// Cancel an approved booking before its day and refund its cost
    pub async fn cancel(&self, actor: &Actor, id: i32) -> AppResult<Booking> {
        let (_booking_guard, booking) = self.lock_booking(id).await?;
        ensure_decider(actor, &booking)?;
        ensure_status(&booking, BookingStatus::Approved, "cancel")?;
        if self.clock.today() >= booking.date {
            return Err(AppError::Conflict(format!(
                "Booking {} can only be cancelled before {}",
                id, booking.date
            )));
        }

        let _account_guard = self.locks.supervisors.lock(booking.supervisor_id).await;
        let now = self.clock.now();
        let account = self.repository.credits.refund(
            booking.supervisor_id,
            booking.student_id,
            booking.cost,
            booking.id,
            now,
        )?;

        let cancelled = self.repository.bookings.update(id, |b| {
            ensure_status(b, BookingStatus::Approved, "cancel")?;
            b.status = BookingStatus::Cancelled;
            Ok(())
        });
        let cancelled = match cancelled {
            Ok(cancelled) => cancelled,
            Err(e) => {
                // Balance cannot have moved: the supervisor lock is still held
                self.repository.credits.debit(
                    booking.supervisor_id,
                    booking.student_id,
                    booking.cost,
                    booking.id,
                    now,
                )?;
                return Err(e);
            }
        };

        tracing::info!(
            booking_id = id,
            supervisor_id = booking.supervisor_id,
            refund = %booking.cost,
            balance = %account.balance,
            "Booking cancelled"
        );
        Ok(cancelled)
    }

    /// Mark an approved booking as used, on or after its day
    pub async fn complete(&self, actor: &Actor, id: i32) -> AppResult<Booking> {
        let (_booking_guard, booking) = self.lock_booking(id).await?;
        ensure_decider(actor, &booking)?;
        ensure_status(&booking, BookingStatus::Approved, "complete")?;
        if self.clock.today() < booking.date {
            return Err(AppError::Conflict(format!(
                "Booking {} cannot be completed before {}",
                id, booking.date
            )));
        }

        let completed = self.repository.bookings.update(id, |b| {
            ensure_status(b, BookingStatus::Approved, "complete")?;
            b.status = BookingStatus::Completed;
            Ok(())
        })?;

        tracing::info!(booking_id = id, "Booking completed");
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use tokio_test::{assert_err, assert_ok};

    use crate::models::equipment::{EquipmentStatus, MaintenanceDetails};
    use crate::models::slot::UpdateSlotTemplate;
    use crate::services::clock::Clock;
    use crate::services::fixtures::Fixture;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn request_for(fixture: &Fixture, slot_id: i32, day: NaiveDate, student_id: i32) -> CreateBooking {
        CreateBooking {
            equipment_id: fixture.equipment.id,
            slot_template_id: slot_id,
            date: day,
            student_id,
            supervisor_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_second_request_on_full_slot_is_refused() {
        let fx = Fixture::new();
        let bookings = &fx.services.bookings;
        let s1 = fx.single_slot().id;

        let first = bookings
            .request(&fx.supervisor_actor(), &request_for(&fx, s1, date(10), fx.student.id))
            .await
            .unwrap();
        assert_eq!(first.status, BookingStatus::Pending);
        assert_eq!(first.supervisor_id, fx.supervisor.id);

        let err = bookings
            .request(&fx.supervisor_actor(), &request_for(&fx, s1, date(10), fx.other_student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Capacity { capacity: 1, .. }));
    }

    #[tokio::test]
    async fn test_approve_without_enough_credit_changes_nothing() {
        let fx = Fixture::new();
        fx.allocate(30);
        let booking = fx.book(fx.single_slot().id, date(10)).await;

        let err = fx
            .services
            .bookings
            .approve(&fx.supervisor_actor(), booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredit { .. }));

        assert_eq!(fx.balance(), Decimal::from(30));
        let booking = fx.repository.bookings.get_by_id(booking.id).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(fx.used(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_approve_then_cancel_refunds() {
        let fx = Fixture::new();
        fx.allocate(100);
        let booking = fx.book(fx.single_slot().id, date(10)).await;

        let approved = assert_ok!(fx.services.bookings.approve(&fx.supervisor_actor(), booking.id).await);
        assert_eq!(approved.status, BookingStatus::Approved);
        assert_eq!(approved.decided_by, Some(fx.supervisor.id));
        assert_eq!(fx.balance(), Decimal::from(50));
        assert_eq!(fx.used(), Decimal::from(50));

        let cancelled = assert_ok!(fx.services.bookings.cancel(&fx.supervisor_actor(), booking.id).await);
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(fx.balance(), Decimal::from(100));
        assert_eq!(fx.used(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_no_double_debit_or_double_refund() {
        let fx = Fixture::new();
        fx.allocate(200);
        let booking = fx.book(fx.single_slot().id, date(10)).await;
        let actor = fx.supervisor_actor();

        assert_ok!(fx.services.bookings.approve(&actor, booking.id).await);
        let err = assert_err!(fx.services.bookings.approve(&actor, booking.id).await);
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                status: BookingStatus::Approved,
                action: "approve",
                ..
            }
        ));
        assert_eq!(fx.balance(), Decimal::from(150));

        assert_ok!(fx.services.bookings.cancel(&actor, booking.id).await);
        assert_err!(fx.services.bookings.cancel(&actor, booking.id).await);
        assert_eq!(fx.balance(), Decimal::from(200));
        assert_eq!(fx.repository.credits.transactions(fx.supervisor.id).len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_debit_once() {
        let fx = Fixture::new();
        fx.allocate(200);
        let booking = fx.book(fx.single_slot().id, date(10)).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bookings = fx.services.bookings.clone();
                let actor = fx.supervisor_actor();
                tokio::spawn(async move { bookings.approve(&actor, booking.id).await })
            })
            .collect();

        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                approved += 1;
            }
        }
        assert_eq!(approved, 1);
        assert_eq!(fx.balance(), Decimal::from(150));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_respect_capacity() {
        let fx = Fixture::new();
        let shared = fx.shared_slot();
        let students = fx.more_students(12);

        let handles: Vec<_> = students
            .iter()
            .map(|student_id| {
                let bookings = fx.services.bookings.clone();
                let actor = fx.supervisor_actor();
                let data = request_for(&fx, shared.id, date(11), *student_id);
                tokio::spawn(async move { bookings.request(&actor, &data).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::Capacity { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(accepted, shared.max_concurrent_bookings);
        let key = SlotKey {
            equipment_id: fx.equipment.id,
            slot_id: shared.id,
            date: date(11),
        };
        assert_eq!(fx.repository.bookings.count_occupying(&key), shared.max_concurrent_bookings);
    }

    #[tokio::test]
    async fn test_rejected_booking_frees_capacity() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;
        let booking = fx.book(s1, date(10)).await;

        let rejected = fx
            .services
            .bookings
            .reject(&fx.supervisor_actor(), booking.id, "Instrument reserved for calibration")
            .await
            .unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Instrument reserved for calibration")
        );

        assert_ok!(
            fx.services
                .bookings
                .request(&fx.supervisor_actor(), &request_for(&fx, s1, date(10), fx.other_student.id))
                .await
        );
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let fx = Fixture::new();
        let booking = fx.book(fx.single_slot().id, date(10)).await;
        let err = fx
            .services
            .bookings
            .reject(&fx.supervisor_actor(), booking.id, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_terminal_states_accept_no_transition() {
        let fx = Fixture::new();
        fx.allocate(500);
        let actor = fx.supervisor_actor();
        let bookings = &fx.services.bookings;

        let rejected = fx.book(fx.shared_slot().id, date(10)).await;
        bookings.reject(&actor, rejected.id, "No").await.unwrap();

        let cancelled = fx.book(fx.shared_slot().id, date(11)).await;
        bookings.approve(&actor, cancelled.id).await.unwrap();
        bookings.cancel(&actor, cancelled.id).await.unwrap();

        let completed = fx.book(fx.single_slot().id, date(4)).await;
        bookings.approve(&actor, completed.id).await.unwrap();
        fx.clock.advance(Duration::days(1));
        bookings.complete(&actor, completed.id).await.unwrap();

        let balance = fx.balance();
        for id in [rejected.id, cancelled.id, completed.id] {
            assert!(matches!(
                bookings.approve(&actor, id).await,
                Err(AppError::InvalidTransition { .. })
            ));
            assert!(matches!(
                bookings.reject(&actor, id, "late").await,
                Err(AppError::InvalidTransition { .. })
            ));
            assert!(matches!(
                bookings.cancel(&actor, id).await,
                Err(AppError::InvalidTransition { .. })
            ));
            assert!(matches!(
                bookings.complete(&actor, id).await,
                Err(AppError::InvalidTransition { .. })
            ));
        }
        assert_eq!(fx.balance(), balance);
    }

    #[tokio::test]
    async fn test_cost_is_snapshotted_at_request() {
        let fx = Fixture::new();
        fx.allocate(100);
        let slot = fx.single_slot();
        let booking = fx.book(slot.id, date(10)).await;

        let mut repriced = slot.clone();
        repriced.apply(&UpdateSlotTemplate {
            usage_charge: Some(Decimal::from(80)),
            ..Default::default()
        });
        fx.repository
            .equipment
            .replace_slot(fx.equipment.id, repriced, fx.clock.now())
            .unwrap();

        let approved = fx
            .services
            .bookings
            .approve(&fx.supervisor_actor(), booking.id)
            .await
            .unwrap();
        assert_eq!(approved.cost, Decimal::from(50));
        assert_eq!(fx.balance(), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_cancel_and_complete_date_windows() {
        let fx = Fixture::new();
        fx.allocate(500);
        let actor = fx.supervisor_actor();
        let booking = fx.book(fx.single_slot().id, date(5)).await;
        fx.services.bookings.approve(&actor, booking.id).await.unwrap();

        let err = fx.services.bookings.complete(&actor, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        fx.clock.set(fx.clock.now() + Duration::days(2));
        let err = fx.services.bookings.cancel(&actor, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let completed = fx.services.bookings.complete(&actor, booking.id).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert_eq!(fx.used(), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_closed_cells_are_not_bookable() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;
        let actor = fx.supervisor_actor();

        // Saturday
        let err = fx
            .services
            .bookings
            .request(&actor, &request_for(&fx, s1, date(8), fx.student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotBookable(_)));

        // Before the clock's today
        let err = fx
            .services
            .bookings
            .request(&actor, &request_for(&fx, s1, date(1), fx.student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotBookable(_)));
    }

    #[tokio::test]
    async fn test_student_must_belong_to_supervisor() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;

        let mut data = request_for(&fx, s1, date(10), fx.student.id);
        data.supervisor_id = Some(fx.other_supervisor.id);
        let err = fx.services.bookings.request(&fx.admin_actor(), &data).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = fx
            .services
            .bookings
            .request(&fx.supervisor_actor(), &request_for(&fx, s1, date(10), fx.supervisor.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_owning_supervisor_decides() {
        let fx = Fixture::new();
        fx.allocate(100);
        let booking = fx.book(fx.single_slot().id, date(10)).await;

        let other = Actor {
            user_id: fx.other_supervisor.id,
            role: Role::Supervisor,
        };
        assert!(matches!(
            fx.services.bookings.approve(&other, booking.id).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            fx.services.bookings.approve(&fx.student_actor(), booking.id).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            fx.services
                .bookings
                .request(&other, &request_for(&fx, fx.shared_slot().id, date(10), fx.student.id))
                .await,
            Err(AppError::Authorization(_))
        ));

        assert_ok!(fx.services.bookings.approve(&fx.admin_actor(), booking.id).await);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_caller() {
        let fx = Fixture::new();
        let mine = fx.book(fx.single_slot().id, date(10)).await;
        fx.book_for(fx.other_student.id, fx.shared_slot().id, date(10)).await;

        let student_view = fx
            .services
            .bookings
            .list(&fx.student_actor(), BookingQuery::default())
            .await
            .unwrap();
        assert_eq!(student_view.len(), 1);
        assert_eq!(student_view[0].id, mine.id);

        let supervisor_view = fx
            .services
            .bookings
            .list(&fx.supervisor_actor(), BookingQuery::default())
            .await
            .unwrap();
        assert_eq!(supervisor_view.len(), 2);
        // Ordered by start time within a day
        assert!(supervisor_view[0].start_time <= supervisor_view[1].start_time);

        let other = Actor {
            user_id: fx.other_supervisor.id,
            role: Role::Supervisor,
        };
        assert!(fx
            .services
            .bookings
            .list(&other, BookingQuery::default())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            fx.services.bookings.get(&other, mine.id).await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_keeps_existing_booking_supervisor() {
        let fx = Fixture::new();
        let booking = fx.book(fx.single_slot().id, date(10)).await;
        fx.repository
            .users
            .set_supervisor(fx.student.id, fx.other_supervisor.id)
            .unwrap();

        let stored = fx.repository.bookings.get_by_id(booking.id).unwrap();
        assert_eq!(stored.supervisor_id, fx.supervisor.id);
    }

    #[tokio::test]
    async fn test_transfer_while_request_waits_is_honoured() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;
        let key = SlotKey {
            equipment_id: fx.equipment.id,
            slot_id: s1,
            date: date(10),
        };

        let held = fx.services.bookings.locks.slots.lock(key).await;
        let waiting = {
            let bookings = fx.services.bookings.clone();
            let actor = fx.supervisor_actor();
            let data = request_for(&fx, s1, date(10), fx.student.id);
            tokio::spawn(async move { bookings.request(&actor, &data).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        fx.services
            .users
            .transfer_student(&fx.admin_actor(), fx.student.id, fx.other_supervisor.id)
            .await
            .unwrap();
        drop(held);

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert!(fx.repository.bookings.list(&BookingQuery::default()).is_empty());

        // Made by the new supervisor, the same request goes through
        let new_supervisor = Actor {
            user_id: fx.other_supervisor.id,
            role: Role::Supervisor,
        };
        let booking = fx
            .services
            .bookings
            .request(&new_supervisor, &request_for(&fx, s1, date(10), fx.student.id))
            .await
            .unwrap();
        assert_eq!(booking.supervisor_id, fx.other_supervisor.id);
    }

    #[tokio::test]
    async fn test_lock_tables_do_not_grow() {
        let fx = Fixture::new();
        fx.allocate(100);
        let bookings = &fx.services.bookings;
        let actor = fx.admin_actor();

        for id in 1000..1200 {
            assert!(matches!(bookings.approve(&actor, id).await, Err(AppError::NotFound(_))));
            assert!(matches!(bookings.cancel(&actor, id).await, Err(AppError::NotFound(_))));
        }
        for offset in 0..50 {
            let mut data = request_for(&fx, fx.single_slot().id, date(10), fx.student.id);
            data.equipment_id = 500 + offset;
            assert!(matches!(bookings.request(&actor, &data).await, Err(AppError::NotFound(_))));
        }

        let booking = fx.book(fx.single_slot().id, date(10)).await;
        bookings.approve(&actor, booking.id).await.unwrap();

        let locks = &bookings.locks;
        assert!(locks.bookings.is_empty());
        assert!(locks.slots.is_empty());
        assert!(locks.students.is_empty());
        assert!(locks.supervisors.is_empty());
        assert!(locks.equipment.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refund_leaves_booking_approved() {
        let fx = Fixture::new();
        let booking = fx.book(fx.single_slot().id, date(10)).await;
        // Charged to an account that does not exist, so the refund cannot happen
        fx.repository
            .bookings
            .update(booking.id, |b| {
                b.status = BookingStatus::Approved;
                b.supervisor_id = 999;
                Ok(())
            })
            .unwrap();

        let err = fx
            .services
            .bookings
            .cancel(&fx.admin_actor(), booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let stored = fx.repository.bookings.get_by_id(booking.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_unavailable_equipment_is_not_bookable() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;
        let actor = fx.supervisor_actor();
        let equipment = &fx.repository.equipment;

        equipment
            .set_status(
                fx.equipment.id,
                EquipmentStatus::Maintenance,
                Some(MaintenanceDetails {
                    reason: "Lens replacement".to_string(),
                    expected_completion_date: date(20),
                    start_date: date(3),
                }),
                fx.clock.now(),
            )
            .unwrap();
        let err = assert_err!(
            fx.services
                .bookings
                .request(&actor, &request_for(&fx, s1, date(10), fx.student.id))
                .await
        );
        assert!(matches!(err, AppError::NotBookable(_)));

        equipment
            .set_status(fx.equipment.id, EquipmentStatus::Retired, None, fx.clock.now())
            .unwrap();
        let err = assert_err!(
            fx.services
                .bookings
                .request(&actor, &request_for(&fx, s1, date(10), fx.student.id))
                .await
        );
        assert!(matches!(err, AppError::NotBookable(_)));
        assert!(fx.repository.bookings.list(&BookingQuery::default()).is_empty());
    }

    #[tokio::test]
    async fn test_deleted_slot_is_not_bookable() {
        let fx = Fixture::new();
        let s1 = fx.single_slot().id;
        fx.repository
            .equipment
            .delete_slot(fx.equipment.id, s1, fx.clock.now())
            .unwrap();

        let err = fx
            .services
            .bookings
            .request(&fx.supervisor_actor(), &request_for(&fx, s1, date(10), fx.student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
