//! In-memory ledger store for `vaxbook`
//!
//! All three ledgers live behind one async mutex. A unit of work owns the lock
//! from `begin` until it is committed, rolled back or dropped, so units are
//! fully serialized. Every mutation records its inverse; rolling back (or
//! dropping an uncommitted unit) replays those inverses newest first.
//!
//! Useful for tests, demos and single-process deployments where durability is
//! not required.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod state;

use std::sync::Arc;
use std::time::Duration;

use nutype::nutype;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};
use vaxbook::{
    Appointment, AppointmentDate, AppointmentId, AppointmentLedger, AvailabilityRegistry,
    CaregiverId, DoseCount, DoseDelta, InventoryLedger, LedgerError, LedgerStore, Operation,
    PatientId, StorageError, UnitOfWork, Vaccine, VaccineName,
};

use state::{LedgerState, Undo};
pub use state::LedgerSnapshot;

/// How long `begin` waits for the ledger lock, in milliseconds (1 to 60 000).
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 60_000),
    default = 5_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Default,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct LockTimeoutMs(u64);

impl LockTimeoutMs {
    /// The timeout as a `Duration`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

/// Settings for [`InMemoryLedgerStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Wait limit for acquiring the ledger lock.
    #[serde(default)]
    pub lock_timeout: LockTimeoutMs,
}

/// Thread-safe in-memory ledger store.
///
/// Clones share the same ledgers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
    config: MemoryConfig,
}

impl InMemoryLedgerStore {
    /// Creates an empty store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with custom settings.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            state: Arc::default(),
            config,
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Copies the committed ledger contents.
    ///
    /// Waits for any open unit of work to finish.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// The largest appointment identifier ever assigned, if any.
    pub async fn last_assigned_id(&self) -> Option<AppointmentId> {
        self.state.lock().await.high_water
    }
}

impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryUnit;

    async fn begin(&self) -> Result<Self::Unit, StorageError> {
        let timeout = self.config.lock_timeout;
        let guard = tokio::time::timeout(timeout.as_duration(), Arc::clone(&self.state).lock_owned())
            .await
            .map_err(|_| {
                StorageError::new(
                    Operation::Begin,
                    format!("ledger lock not acquired within {timeout} ms"),
                )
            })?;
        Ok(InMemoryUnit {
            state: guard,
            undo: Vec::new(),
        })
    }
}

/// A unit of work holding exclusive access to the in-memory ledgers.
///
/// Dropping it without committing reverts its changes.
#[derive(Debug)]
pub struct InMemoryUnit {
    state: OwnedMutexGuard<LedgerState>,
    undo: Vec<Undo>,
}

impl InMemoryUnit {
    fn revert_all(&mut self) -> Result<(), StorageError> {
        let entries = std::mem::take(&mut self.undo);
        let count = entries.len();
        let mut first_failure = None;
        for entry in entries.into_iter().rev() {
            if let Err(detail) = self.state.revert(entry) {
                first_failure.get_or_insert(detail);
            }
        }
        debug!(reverted = count, "[memory.unit_reverted] undo log replayed");
        first_failure.map_or(Ok(()), |detail| {
            Err(StorageError::new(Operation::Rollback, detail))
        })
    }

    fn stock_of(&self, vaccine: &VaccineName) -> Result<DoseCount, LedgerError> {
        self.state
            .vaccines
            .get(vaccine)
            .copied()
            .ok_or_else(|| LedgerError::VaccineNotFound(vaccine.clone()))
    }

    fn set_stock(&mut self, vaccine: &VaccineName, previous: DoseCount, doses: DoseCount) {
        self.undo.push(Undo::SetStock(vaccine.clone(), previous));
        self.state.vaccines.insert(vaccine.clone(), doses);
    }
}

impl Drop for InMemoryUnit {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        if let Err(error) = self.revert_all() {
            error!(error = %error, "[memory.unit_discarded] could not revert dropped unit of work");
        }
    }
}

impl UnitOfWork for InMemoryUnit {
    async fn commit(mut self) -> Result<(), StorageError> {
        debug!(mutations = self.undo.len(), "[memory.unit_committed] unit of work committed");
        self.undo.clear();
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StorageError> {
        self.revert_all()
    }
}

impl InventoryLedger for InMemoryUnit {
    async fn get_stock(&mut self, vaccine: &VaccineName) -> Result<DoseCount, LedgerError> {
        self.stock_of(vaccine)
    }

    async fn list_stock(&mut self) -> Result<Vec<Vaccine>, LedgerError> {
        Ok(self
            .state
            .vaccines
            .iter()
            .map(|(name, doses)| Vaccine::new(name.clone(), *doses))
            .collect())
    }

    async fn add_stock(
        &mut self,
        vaccine: &VaccineName,
        delta: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        match self.state.vaccines.get(vaccine).copied() {
            Some(current) => {
                let doses = current
                    .checked_add(delta)
                    .ok_or_else(|| LedgerError::StockOverflow(vaccine.clone()))?;
                self.set_stock(vaccine, current, doses);
                Ok(doses)
            }
            None => {
                let doses = DoseCount::from(delta);
                self.undo.push(Undo::RemoveVaccine(vaccine.clone()));
                self.state.vaccines.insert(vaccine.clone(), doses);
                Ok(doses)
            }
        }
    }

    async fn decrement_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        let current = self.stock_of(vaccine)?;
        let doses = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientStock {
                vaccine: vaccine.clone(),
                available: current,
                requested: amount,
            })?;
        self.set_stock(vaccine, current, doses);
        Ok(doses)
    }

    async fn increment_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        let current = self.stock_of(vaccine)?;
        let doses = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::StockOverflow(vaccine.clone()))?;
        self.set_stock(vaccine, current, doses);
        Ok(doses)
    }
}

impl AvailabilityRegistry for InMemoryUnit {
    async fn offer(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        if self.state.is_booked(caregiver, date) {
            return Err(LedgerError::SlotBooked {
                caregiver: caregiver.clone(),
                date,
            });
        }
        if !self.state.insert_slot(caregiver.clone(), date) {
            return Err(LedgerError::SlotAlreadyOffered {
                caregiver: caregiver.clone(),
                date,
            });
        }
        self.undo.push(Undo::RemoveSlot(caregiver.clone(), date));
        Ok(())
    }

    async fn find_earliest(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Option<CaregiverId>, LedgerError> {
        Ok(self
            .state
            .slots
            .get(&date)
            .and_then(|caregivers| caregivers.first().cloned()))
    }

    async fn remove(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        if !self.state.remove_slot(caregiver, date) {
            return Err(LedgerError::SlotNotFound {
                caregiver: caregiver.clone(),
                date,
            });
        }
        self.undo.push(Undo::InsertSlot(caregiver.clone(), date));
        Ok(())
    }

    async fn restore(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        if self.state.insert_slot(caregiver.clone(), date) {
            self.undo.push(Undo::RemoveSlot(caregiver.clone(), date));
        }
        Ok(())
    }

    async fn is_offered(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<bool, LedgerError> {
        Ok(self.state.has_slot(caregiver, date))
    }

    async fn list_for_date(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Vec<CaregiverId>, LedgerError> {
        Ok(self
            .state
            .slots
            .get(&date)
            .map(|caregivers| caregivers.iter().cloned().collect())
            .unwrap_or_default())
    }
}

impl AppointmentLedger for InMemoryUnit {
    async fn next_id(&mut self) -> Result<AppointmentId, LedgerError> {
        match self.state.high_water {
            None => Ok(AppointmentId::first()),
            Some(last) => last.next().ok_or(LedgerError::IdentifiersExhausted),
        }
    }

    async fn insert(&mut self, appointment: &Appointment) -> Result<(), LedgerError> {
        let id = appointment.id;
        let previous = self.state.high_water;
        if self.state.appointments.contains_key(&id) || previous.is_some_and(|last| id <= last) {
            return Err(LedgerError::DuplicateAppointmentId(id));
        }
        self.undo.push(Undo::SetHighWater(previous));
        self.state.high_water = Some(id);
        self.undo.push(Undo::RemoveAppointment(id));
        self.state.appointments.insert(id, appointment.clone());
        Ok(())
    }

    async fn find(&mut self, id: AppointmentId) -> Result<Appointment, LedgerError> {
        self.state
            .appointments
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AppointmentNotFound(id))
    }

    async fn delete(&mut self, id: AppointmentId) -> Result<(), LedgerError> {
        let appointment = self
            .state
            .appointments
            .remove(&id)
            .ok_or(LedgerError::AppointmentNotFound(id))?;
        self.undo.push(Undo::InsertAppointment(appointment));
        Ok(())
    }

    async fn list_for_patient(&mut self, patient: &PatientId) -> Result<Vec<Appointment>, LedgerError> {
        Ok(self
            .state
            .appointments
            .values()
            .filter(|appointment| appointment.patient == *patient)
            .cloned()
            .collect())
    }

    async fn list_for_caregiver(
        &mut self,
        caregiver: &CaregiverId,
    ) -> Result<Vec<Appointment>, LedgerError> {
        Ok(self
            .state
            .appointments
            .values()
            .filter(|appointment| appointment.caregiver == *caregiver)
            .cloned()
            .collect())
    }
}
