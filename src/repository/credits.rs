//! Credit accounts, student usage and the credit journal

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::credit::{CreditAccount, CreditTransaction, StudentCreditUsage, TransactionKind},
};

#[derive(Default)]
struct CreditsTable {
    next_transaction_id: i32,
    accounts: HashMap<i32, CreditAccount>,
    usage: HashMap<i32, StudentCreditUsage>,
    journal: Vec<CreditTransaction>,
}

impl CreditsTable {
    fn account_mut(&mut self, supervisor_id: i32) -> AppResult<&mut CreditAccount> {
        self.accounts.get_mut(&supervisor_id).ok_or_else(|| {
            AppError::NotFound(format!("Credit account of supervisor {} not found", supervisor_id))
        })
    }

    fn record(&mut self, mut entry: CreditTransaction) {
        self.next_transaction_id += 1;
        entry.id = self.next_transaction_id;
        self.journal.push(entry);
    }
}

#[derive(Clone, Default)]
pub struct CreditsRepository {
    table: Arc<RwLock<CreditsTable>>,
}

impl CreditsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty account for a new supervisor
    pub fn open_account(&self, supervisor_id: i32) -> CreditAccount {
        let mut table = self.table.write();
        table
            .accounts
            .entry(supervisor_id)
            .or_insert_with(|| CreditAccount {
                supervisor_id,
                balance: Decimal::ZERO,
            })
            .clone()
    }

    /// Open a zero usage record for a new student
    pub fn open_usage(&self, student_id: i32, supervisor_id: i32) -> StudentCreditUsage {
        let mut table = self.table.write();
        table
            .usage
            .entry(student_id)
            .or_insert_with(|| StudentCreditUsage {
                student_id,
                supervisor_id,
                total_used: Decimal::ZERO,
            })
            .clone()
    }

    pub fn account(&self, supervisor_id: i32) -> AppResult<CreditAccount> {
        self.table
            .read()
            .accounts
            .get(&supervisor_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Credit account of supervisor {} not found", supervisor_id))
            })
    }

    pub fn usage(&self, student_id: i32) -> AppResult<StudentCreditUsage> {
        self.table
            .read()
            .usage
            .get(&student_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Credit usage of student {} not found", student_id)))
    }

    pub fn reassign_usage(&self, student_id: i32, supervisor_id: i32) -> AppResult<StudentCreditUsage> {
        let mut table = self.table.write();
        let usage = table
            .usage
            .get_mut(&student_id)
            .ok_or_else(|| AppError::NotFound(format!("Credit usage of student {} not found", student_id)))?;
        usage.supervisor_id = supervisor_id;
        Ok(usage.clone())
    }

    /// Journal entries of a supervisor, oldest first
    pub fn transactions(&self, supervisor_id: i32) -> Vec<CreditTransaction> {
        self.table
            .read()
            .journal
            .iter()
            .filter(|t| t.supervisor_id == supervisor_id)
            .cloned()
            .collect()
    }

    pub fn allocate(
        &self,
        supervisor_id: i32,
        amount: Decimal,
        notes: Option<String>,
        created_by: i32,
        now: DateTime<Utc>,
    ) -> AppResult<CreditAccount> {
        let mut table = self.table.write();
        let account = table.account_mut(supervisor_id)?;
        account.balance += amount;
        let account = account.clone();
        table.record(CreditTransaction {
            id: 0,
            supervisor_id,
            kind: TransactionKind::Allocation,
            amount,
            booking_id: None,
            notes,
            created_by: Some(created_by),
            created_at: now,
        });
        Ok(account)
    }

    /// Check the balance and debit it in one step
    pub(crate) fn debit(
        &self,
        supervisor_id: i32,
        student_id: i32,
        amount: Decimal,
        booking_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<CreditAccount> {
        let mut table = self.table.write();
        let account = table.account_mut(supervisor_id)?;
        if account.balance < amount {
            return Err(AppError::InsufficientCredit {
                supervisor_id,
                balance: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        let account = account.clone();

        if let Some(usage) = table.usage.get_mut(&student_id) {
            usage.total_used += amount;
        }
        table.record(CreditTransaction {
            id: 0,
            supervisor_id,
            kind: TransactionKind::Debit,
            amount,
            booking_id: Some(booking_id),
            notes: None,
            created_by: None,
            created_at: now,
        });
        Ok(account)
    }

    /// Return a debited amount to the account
    pub(crate) fn refund(
        &self,
        supervisor_id: i32,
        student_id: i32,
        amount: Decimal,
        booking_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<CreditAccount> {
        let mut table = self.table.write();
        let account = table.account_mut(supervisor_id)?;
        account.balance += amount;
        let account = account.clone();

        if let Some(usage) = table.usage.get_mut(&student_id) {
            usage.total_used -= amount;
        }
        table.record(CreditTransaction {
            id: 0,
            supervisor_id,
            kind: TransactionKind::Refund,
            amount,
            booking_id: Some(booking_id),
            notes: None,
            created_by: None,
            created_at: now,
        });
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_refuses_overdraft_without_side_effects() {
        let repo = CreditsRepository::new();
        repo.open_account(1);
        repo.open_usage(2, 1);
        repo.allocate(1, Decimal::from(30), None, 99, Utc::now()).unwrap();

        let err = repo.debit(1, 2, Decimal::from(50), 10, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredit { .. }));
        assert_eq!(repo.account(1).unwrap().balance, Decimal::from(30));
        assert_eq!(repo.usage(2).unwrap().total_used, Decimal::ZERO);
        assert_eq!(repo.transactions(1).len(), 1);
    }

    #[test]
    fn test_debit_and_refund_are_journaled() {
        let repo = CreditsRepository::new();
        repo.open_account(1);
        repo.open_usage(2, 1);
        repo.allocate(1, Decimal::from(100), Some("term".into()), 99, Utc::now()).unwrap();
        repo.debit(1, 2, Decimal::from(50), 10, Utc::now()).unwrap();
        assert_eq!(repo.usage(2).unwrap().total_used, Decimal::from(50));

        repo.refund(1, 2, Decimal::from(50), 10, Utc::now()).unwrap();
        assert_eq!(repo.account(1).unwrap().balance, Decimal::from(100));
        assert_eq!(repo.usage(2).unwrap().total_used, Decimal::ZERO);

        let kinds: Vec<_> = repo.transactions(1).iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TransactionKind::Allocation, TransactionKind::Debit, TransactionKind::Refund]
        );
    }
}
