//! Closure days table

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::closure::{Closure, CreateClosure},
};

#[derive(Default)]
struct ClosuresTable {
    next_id: i32,
    rows: Vec<Closure>,
}

#[derive(Clone, Default)]
pub struct ClosuresRepository {
    table: Arc<RwLock<ClosuresTable>>,
}

impl ClosuresRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closures within the optional range, ordered by date
    pub fn list(&self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Vec<Closure> {
        let mut rows: Vec<Closure> = self
            .table
            .read()
            .rows
            .iter()
            .filter(|c| start_date.map_or(true, |d| c.closure_date >= d))
            .filter(|c| end_date.map_or(true, |d| c.closure_date <= d))
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.closure_date);
        rows
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.table.read().rows.iter().any(|c| c.closure_date == date)
    }

    pub fn create(&self, data: &CreateClosure, now: DateTime<Utc>) -> AppResult<Closure> {
        let mut table = self.table.write();
        if table.rows.iter().any(|c| c.closure_date == data.closure_date) {
            return Err(AppError::Conflict(format!(
                "{} is already a closure day",
                data.closure_date
            )));
        }
        table.next_id += 1;
        let closure = Closure {
            id: table.next_id,
            closure_date: data.closure_date,
            reason: data.reason.clone(),
            crea_date: now,
        };
        table.rows.push(closure.clone());
        Ok(closure)
    }

    pub fn delete(&self, id: i32) -> AppResult<()> {
        let mut table = self.table.write();
        let before = table.rows.len();
        table.rows.retain(|c| c.id != id);
        if table.rows.len() == before {
            return Err(AppError::NotFound(format!("Closure {} not found", id)));
        }
        Ok(())
    }
}
