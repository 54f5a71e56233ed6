//! Commit and rollback discipline shared by every mutating operation.
//!
//! Engines record each ledger mutation in a [`Journal`] as it succeeds. When
//! a later step fails, [`finish`] rolls the unit of work back, which undoes
//! every journaled step. A rollback that fails after something was applied
//! escalates to [`SchedulerError::InconsistentState`].

use tracing::{debug, error, warn};

use crate::errors::SchedulerError;
use crate::store::UnitOfWork;

/// A ledger mutation applied inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An appointment record was written.
    InsertAppointment,
    /// A slot was consumed.
    RemoveSlot,
    /// A dose was consumed.
    DecrementStock,
    /// An appointment record was deleted.
    DeleteAppointment,
    /// A dose was returned.
    IncrementStock,
    /// A slot was re-offered.
    RestoreSlot,
    /// A slot was offered.
    OfferSlot,
    /// Doses were added.
    AddStock,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InsertAppointment => "insert_appointment",
            Self::RemoveSlot => "remove_slot",
            Self::DecrementStock => "decrement_stock",
            Self::DeleteAppointment => "delete_appointment",
            Self::IncrementStock => "increment_stock",
            Self::RestoreSlot => "restore_slot",
            Self::OfferSlot => "offer_slot",
            Self::AddStock => "add_stock",
        };
        f.write_str(name)
    }
}

/// Steps applied so far by one operation, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Journal {
    steps: Vec<Step>,
}

impl Journal {
    pub(crate) fn record(&mut self, step: Step) {
        debug!(step = %step, "[engine.step_applied] ledger mutation applied");
        self.steps.push(step);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Display for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("no steps");
        }
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Commits `unit` if `outcome` succeeded, otherwise rolls it back.
pub(crate) async fn finish<U, T>(
    unit: U,
    journal: Journal,
    outcome: Result<T, SchedulerError>,
    operation: &'static str,
) -> Result<T, SchedulerError>
where
    U: UnitOfWork,
{
    match outcome {
        Ok(value) => match unit.commit().await {
            Ok(()) => Ok(value),
            Err(commit_error) => {
                error!(
                    operation,
                    steps = %journal,
                    error = %commit_error,
                    "[engine.commit_failed] unit of work was not committed"
                );
                Err(SchedulerError::Storage(commit_error))
            }
        },
        Err(failure) => Err(abort(unit, &journal, failure, operation).await),
    }
}

/// Rolls back `unit` after `failure` and decides what the caller sees.
pub(crate) async fn abort<U>(
    unit: U,
    journal: &Journal,
    failure: SchedulerError,
    operation: &'static str,
) -> SchedulerError
where
    U: UnitOfWork,
{
    match unit.rollback().await {
        Ok(()) => {
            if !journal.is_empty() {
                warn!(
                    operation,
                    steps = %journal,
                    error = %failure,
                    "[engine.rolled_back] undid applied steps after failure"
                );
            }
            failure
        }
        Err(rollback_error) if journal.is_empty() => {
            warn!(
                operation,
                error = %failure,
                rollback_error = %rollback_error,
                "[engine.rollback_failed] rollback failed before any step was applied"
            );
            failure
        }
        Err(rollback_error) => {
            error!(
                operation,
                steps = %journal,
                error = %failure,
                rollback_error = %rollback_error,
                "[engine.inconsistent_state] rollback failed after a partial commit"
            );
            SchedulerError::InconsistentState(format!(
                "{operation} failed ({failure}) after {journal}; rollback failed: {rollback_error}"
            ))
        }
    }
}

/// Ends a read-only unit of work and returns what it read.
pub(crate) async fn conclude_read<U, T>(
    unit: U,
    outcome: Result<T, SchedulerError>,
    operation: &'static str,
) -> Result<T, SchedulerError>
where
    U: UnitOfWork,
{
    if let Err(rollback_error) = unit.rollback().await {
        error!(
            operation,
            rollback_error = %rollback_error,
            "[engine.read_release_failed] could not release read-only unit of work"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_lists_steps_in_order() {
        let mut journal = Journal::default();
        assert_eq!(journal.to_string(), "no steps");

        journal.record(Step::InsertAppointment);
        journal.record(Step::RemoveSlot);
        assert!(!journal.is_empty());
        assert_eq!(journal.to_string(), "insert_appointment, remove_slot");
    }
}
