//! Booking calendar: which days accept bookings, and closure management

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::{
    error::AppResult,
    models::closure::{Closure, CreateClosure},
    repository::Repository,
};

use super::clock::Clock;

/// Pluggable weekend/holiday policy consulted by the availability resolver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingCalendar: Send + Sync {
    async fn is_bookable(&self, date: NaiveDate) -> bool;
}

/// Closes configured weekdays and the closure days stored in the repository
#[derive(Clone)]
pub struct ClosureCalendar {
    closed_weekdays: Vec<i16>,
    repository: Repository,
}

impl ClosureCalendar {
    pub fn new(closed_weekdays: Vec<i16>, repository: Repository) -> Self {
        Self {
            closed_weekdays,
            repository,
        }
    }
}

#[async_trait]
impl BookingCalendar for ClosureCalendar {
    async fn is_bookable(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_monday() as i16;
        !self.closed_weekdays.contains(&weekday) && !self.repository.closures.is_closed(date)
    }
}

/// Closure days management
#[derive(Clone)]
pub struct CalendarService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CalendarService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn list_closures(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<Closure>> {
        Ok(self.repository.closures.list(start_date, end_date))
    }

    pub async fn create_closure(&self, data: &CreateClosure) -> AppResult<Closure> {
        let closure = self.repository.closures.create(data, self.clock.now())?;
        tracing::info!(closure_date = %closure.closure_date, "Closure day added");
        Ok(closure)
    }

    pub async fn delete_closure(&self, id: i32) -> AppResult<()> {
        self.repository.closures.delete(id)
    }
}
