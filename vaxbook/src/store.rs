//! Units of work spanning all three ledgers.
//!
//! A [`LedgerStore`] hands out [`UnitOfWork`]s. Everything done through one
//! unit becomes visible together on [`UnitOfWork::commit`] or not at all.
//! How a backend achieves that is its own business: the in-memory store holds
//! one lock over every ledger and keeps an undo log, PostgreSQL uses a
//! transaction with row locks.

use std::future::Future;
use std::sync::Arc;

use crate::errors::StorageError;
use crate::ledger::{AppointmentLedger, AvailabilityRegistry, InventoryLedger};

/// An isolated, all-or-nothing view of the three ledgers.
///
/// Dropping a unit without calling [`UnitOfWork::commit`] discards its
/// changes.
pub trait UnitOfWork: InventoryLedger + AvailabilityRegistry + AppointmentLedger + Send {
    /// Makes every change made through this unit visible.
    fn commit(self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Undoes every change made through this unit.
    ///
    /// An error here means the backend could not confirm the undo and the
    /// ledgers may no longer agree.
    fn rollback(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// A source of units of work.
///
/// Units begun from the same store are isolated from one another: no unit can
/// observe or interleave with another unit's uncommitted changes, so
/// check-then-act sequences inside a unit are free of lost updates.
pub trait LedgerStore: Send + Sync {
    /// The unit of work type for this backend.
    type Unit: UnitOfWork;

    /// Opens a unit of work, waiting for any conflicting unit to finish.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StorageError>> + Send;
}

impl<S> LedgerStore for &S
where
    S: LedgerStore,
{
    type Unit = S::Unit;

    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StorageError>> + Send {
        (**self).begin()
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    type Unit = S::Unit;

    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StorageError>> + Send {
        (**self).begin()
    }
}
