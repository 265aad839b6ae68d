//! Supervisor credit accounts

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    config::ALLOCATION_CEILING,
    error::{AppError, AppResult},
    models::{
        credit::{AllocateCredit, CreditAccount, CreditTransaction, StudentCreditUsage},
        user::{Actor, Role},
    },
    repository::Repository,
};

use super::{clock::Clock, locks::LockTable};

#[derive(Clone)]
pub struct CreditsService {
    repository: Repository,
    locks: Arc<LockTable>,
    clock: Arc<dyn Clock>,
    max_allocation: Decimal,
}

impl CreditsService {
    /// `max_allocation` is clamped to `ALLOCATION_CEILING`
    pub fn new(repository: Repository, locks: Arc<LockTable>, clock: Arc<dyn Clock>, max_allocation: Decimal) -> Self {
        Self {
            repository,
            locks,
            clock,
            max_allocation: max_allocation.min(Decimal::from(ALLOCATION_CEILING)),
        }
    }

    fn ensure_account_reader(&self, actor: &Actor, supervisor_id: i32) -> AppResult<()> {
        if actor.is_admin() || (actor.is_supervisor() && actor.user_id == supervisor_id) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Credit account of supervisor {} is not yours",
                supervisor_id
            )))
        }
    }

    pub async fn account(&self, actor: &Actor, supervisor_id: i32) -> AppResult<CreditAccount> {
        self.ensure_account_reader(actor, supervisor_id)?;
        self.repository.credits.account(supervisor_id)
    }

    pub async fn transactions(&self, actor: &Actor, supervisor_id: i32) -> AppResult<Vec<CreditTransaction>> {
        self.ensure_account_reader(actor, supervisor_id)?;
        self.repository.credits.account(supervisor_id)?;
        Ok(self.repository.credits.transactions(supervisor_id))
    }

    /// Credit consumed by a student; visible to the student, their supervisor and admins
    pub async fn usage(&self, actor: &Actor, student_id: i32) -> AppResult<StudentCreditUsage> {
        let usage = self.repository.credits.usage(student_id)?;
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Supervisor => usage.supervisor_id == actor.user_id,
            Role::Student => usage.student_id == actor.user_id,
        };
        if !allowed {
            return Err(AppError::Authorization(format!(
                "Credit usage of student {} is not visible to you",
                student_id
            )));
        }
        Ok(usage)
    }

    /// Add credit to a supervisor account (admin only)
    pub async fn allocate(&self, actor: &Actor, supervisor_id: i32, data: &AllocateCredit) -> AppResult<CreditAccount> {
        if !actor.is_admin() {
            return Err(AppError::Authorization("Only administrators allocate credit".to_string()));
        }
        if data.amount <= Decimal::ZERO || data.amount > self.max_allocation {
            return Err(AppError::Validation(format!(
                "Allocation must be greater than 0 and at most {}",
                self.max_allocation
            )));
        }
        let supervisor = self.repository.users.get_by_id(supervisor_id)?;
        if supervisor.role != Role::Supervisor {
            return Err(AppError::Validation(format!("User {} is not a supervisor", supervisor_id)));
        }

        let _account_guard = self.locks.supervisors.lock(supervisor_id).await;
        let notes = data
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let account =
            self.repository
                .credits
                .allocate(supervisor_id, data.amount, notes, actor.user_id, self.clock.now())?;

        tracing::info!(
            supervisor_id,
            amount = %data.amount,
            balance = %account.balance,
            "Credit allocated"
        );
        Ok(account)
    }
}
