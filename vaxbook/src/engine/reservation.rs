//! Booking an appointment across all three ledgers.

use tracing::{debug, info, instrument};

use super::journal::{finish, Journal, Step};
use crate::appointment::Appointment;
use crate::errors::SchedulerError;
use crate::store::{LedgerStore, UnitOfWork};
use crate::types::{AppointmentDate, DoseDelta, PatientId, VaccineName};

/// Turns a patient request into an appointment, consuming one slot and one
/// dose.
///
/// The whole booking runs inside one unit of work, so two patients racing for
/// the last slot or the last dose can never both succeed.
#[derive(Debug)]
pub struct ReservationEngine<'a, S> {
    store: &'a S,
}

impl<'a, S> ReservationEngine<'a, S>
where
    S: LedgerStore,
{
    /// Creates an engine over `store`.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Books `vaccine` for `patient` on `date` with the first caregiver
    /// offering that date.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NoAvailability`] when nobody offers the date
    /// - [`SchedulerError::UnknownVaccine`] / [`SchedulerError::NoStock`] when
    ///   no dose can be consumed
    /// - [`SchedulerError::Storage`] when the store fails and the booking was
    ///   undone
    /// - [`SchedulerError::InconsistentState`] when the booking could not be
    ///   undone
    #[instrument(
        name = "reservation.reserve",
        skip_all,
        fields(patient = %patient, date = %date, vaccine = %vaccine)
    )]
    pub async fn reserve(
        &self,
        patient: &PatientId,
        date: AppointmentDate,
        vaccine: &VaccineName,
    ) -> Result<Appointment, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let mut journal = Journal::default();

        let outcome = book(&mut unit, &mut journal, patient, date, vaccine).await;
        let appointment = finish(unit, journal, outcome, "reserve").await?;

        info!(
            appointment_id = %appointment.id,
            caregiver = %appointment.caregiver,
            "[reservation.committed] appointment booked"
        );
        Ok(appointment)
    }
}

async fn book<U>(
    unit: &mut U,
    journal: &mut Journal,
    patient: &PatientId,
    date: AppointmentDate,
    vaccine: &VaccineName,
) -> Result<Appointment, SchedulerError>
where
    U: UnitOfWork,
{
    let caregiver = unit
        .find_earliest(date)
        .await?
        .ok_or(SchedulerError::NoAvailability(date))?;

    let stock = unit.get_stock(vaccine).await?;
    if stock.is_zero() {
        return Err(SchedulerError::NoStock(vaccine.clone()));
    }

    let id = unit.next_id().await?;
    debug!(
        appointment_id = %id,
        caregiver = %caregiver,
        stock = %stock,
        "[reservation.selected] caregiver and identifier chosen"
    );

    let appointment = Appointment::new(id, patient.clone(), caregiver, date, vaccine.clone());

    unit.insert(&appointment).await?;
    journal.record(Step::InsertAppointment);

    unit.remove(&appointment.caregiver, date).await?;
    journal.record(Step::RemoveSlot);

    unit.decrement_stock(vaccine, DoseDelta::one()).await?;
    journal.record(Step::DecrementStock);

    Ok(appointment)
}
