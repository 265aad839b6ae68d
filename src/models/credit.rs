//! Credit accounts and journal

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Spending power of a supervisor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditAccount {
    pub supervisor_id: i32,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
}

/// Credit consumed by a student's approved bookings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentCreditUsage {
    pub student_id: i32,
    pub supervisor_id: i32,
    #[schema(value_type = String, example = "50.00")]
    pub total_used: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Allocation,
    Debit,
    Refund,
}

/// One credit-affecting event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditTransaction {
    pub id: i32,
    pub supervisor_id: i32,
    pub kind: TransactionKind,
    /// Always positive; the kind gives the direction
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    pub booking_id: Option<i32>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Allocation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AllocateCredit {
    #[schema(value_type = String, example = "250")]
    pub amount: Decimal,
    pub notes: Option<String>,
}
