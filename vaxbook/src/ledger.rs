//! The three ledgers.
//!
//! Each trait is implemented by a backend's unit of work (see
//! [`crate::store`]), so every call already runs inside the isolation that
//! unit provides. Operations never partially apply: a refused call leaves its
//! ledger unchanged.

use std::future::Future;

use crate::appointment::{Appointment, Vaccine};
use crate::errors::LedgerError;
use crate::types::{
    AppointmentDate, AppointmentId, CaregiverId, DoseCount, DoseDelta, PatientId, VaccineName,
};

/// Vaccine stock counts with a floor of zero.
pub trait InventoryLedger {
    /// Current stock of `vaccine`.
    ///
    /// Fails with [`LedgerError::VaccineNotFound`] if the vaccine was never
    /// stocked.
    fn get_stock(
        &mut self,
        vaccine: &VaccineName,
    ) -> impl Future<Output = Result<DoseCount, LedgerError>> + Send;

    /// Every vaccine in the inventory, in ascending name order.
    fn list_stock(&mut self) -> impl Future<Output = Result<Vec<Vaccine>, LedgerError>> + Send;

    /// Creates the vaccine with `delta` doses, or adds `delta` to its stock.
    /// Returns the new stock.
    fn add_stock(
        &mut self,
        vaccine: &VaccineName,
        delta: DoseDelta,
    ) -> impl Future<Output = Result<DoseCount, LedgerError>> + Send;

    /// Consumes `amount` doses and returns the remaining stock.
    ///
    /// Fails without changing anything if the vaccine is absent or fewer than
    /// `amount` doses remain.
    fn decrement_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> impl Future<Output = Result<DoseCount, LedgerError>> + Send;

    /// Returns `amount` doses to an existing vaccine.
    ///
    /// Unlike [`InventoryLedger::add_stock`] this never creates a record; a
    /// missing vaccine means the ledgers disagree.
    fn increment_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> impl Future<Output = Result<DoseCount, LedgerError>> + Send;
}

/// Offered, unclaimed (caregiver, date) slots.
pub trait AvailabilityRegistry {
    /// Offers a new slot.
    ///
    /// Refused with [`LedgerError::SlotBooked`] while an appointment holds the
    /// same caregiver and date, and with [`LedgerError::SlotAlreadyOffered`]
    /// for a second offer of a live slot. The booked check and the insert are
    /// atomic with respect to concurrent reservations and cancellations of
    /// the pair.
    fn offer(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// The caregiver with the smallest identifier offering `date`, if any.
    fn find_earliest(
        &mut self,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<Option<CaregiverId>, LedgerError>> + Send;

    /// Consumes a slot. Fails with [`LedgerError::SlotNotFound`] if it is not
    /// offered.
    fn remove(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Re-offers a slot freed by a cancellation. Succeeds whether or not the
    /// slot was ever removed.
    fn restore(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Whether the slot is currently offered.
    fn is_offered(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Every caregiver offering `date`, in ascending identifier order.
    fn list_for_date(
        &mut self,
        date: AppointmentDate,
    ) -> impl Future<Output = Result<Vec<CaregiverId>, LedgerError>> + Send;
}

/// Booked appointments; the source of truth for cancellation.
pub trait AppointmentLedger {
    /// One more than the largest identifier this ledger has ever assigned, or
    /// [`AppointmentId::first`] for a ledger that never held a record.
    ///
    /// Deleting an appointment does not lower the result; identifiers are
    /// never reused.
    fn next_id(&mut self) -> impl Future<Output = Result<AppointmentId, LedgerError>> + Send;

    /// Stores a new appointment.
    ///
    /// Fails with [`LedgerError::DuplicateAppointmentId`] if the identifier is
    /// live or not above every identifier assigned so far.
    fn insert(
        &mut self,
        appointment: &Appointment,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Looks up an appointment.
    fn find(
        &mut self,
        id: AppointmentId,
    ) -> impl Future<Output = Result<Appointment, LedgerError>> + Send;

    /// Deletes an appointment.
    fn delete(&mut self, id: AppointmentId) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// A patient's appointments in ascending identifier order.
    fn list_for_patient(
        &mut self,
        patient: &PatientId,
    ) -> impl Future<Output = Result<Vec<Appointment>, LedgerError>> + Send;

    /// A caregiver's appointments in ascending identifier order.
    fn list_for_caregiver(
        &mut self,
        caregiver: &CaregiverId,
    ) -> impl Future<Output = Result<Vec<Appointment>, LedgerError>> + Send;
}
