//! Business logic services

pub mod availability;
pub mod bookings;
pub mod calendar;
pub mod clock;
pub mod credits;
pub mod equipment;
pub mod locks;
pub mod slots;
pub mod users;

#[cfg(test)]
pub(crate) mod fixtures;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

use self::{
    calendar::{BookingCalendar, ClosureCalendar},
    clock::Clock,
    locks::LockTable,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub slots: slots::SlotsService,
    pub availability: availability::AvailabilityService,
    pub bookings: bookings::BookingsService,
    pub credits: credits::CreditsService,
    pub calendar: calendar::CalendarService,
}

impl Services {
    /// Create all services over the given repository, closing the configured weekdays
    pub fn new(repository: Repository, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let calendar = Arc::new(ClosureCalendar::new(
            config.booking.closed_weekdays.clone(),
            repository.clone(),
        ));
        Self::with_calendar(repository, config, clock, calendar)
    }

    /// Create all services with a custom booking calendar
    pub fn with_calendar(
        repository: Repository,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        calendar: Arc<dyn BookingCalendar>,
    ) -> Self {
        let locks = Arc::new(LockTable::default());
        let availability =
            availability::AvailabilityService::new(repository.clone(), calendar, clock.clone());

        Self {
            users: users::UsersService::new(
                repository.clone(),
                config.users.clone(),
                locks.clone(),
                clock.clone(),
            ),
            equipment: equipment::EquipmentService::new(repository.clone(), locks.clone(), clock.clone()),
            slots: slots::SlotsService::new(repository.clone(), locks.clone(), clock.clone()),
            bookings: bookings::BookingsService::new(
                repository.clone(),
                availability.clone(),
                locks.clone(),
                clock.clone(),
            ),
            credits: credits::CreditsService::new(
                repository.clone(),
                locks,
                clock.clone(),
                config.booking.max_allocation,
            ),
            calendar: calendar::CalendarService::new(repository, clock),
            availability,
        }
    }
}
