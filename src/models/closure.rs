//! Closure days (holidays and exceptional closures)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A day on which nothing can be booked
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Closure {
    pub id: i32,
    pub closure_date: NaiveDate,
    pub reason: Option<String>,
    pub crea_date: DateTime<Utc>,
}

/// Create closure request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClosure {
    /// Closure date (YYYY-MM-DD)
    pub closure_date: NaiveDate,
    pub reason: Option<String>,
}

/// Query parameters for closures
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ClosureQuery {
    /// Filter closures from this date (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Filter closures until this date (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}
