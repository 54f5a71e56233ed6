//! Cancelling an appointment and returning its resources.

use tracing::{error, info, instrument, warn};

use super::journal::{finish, Journal, Step};
use crate::appointment::Appointment;
use crate::errors::{LedgerError, SchedulerError};
use crate::session::{Action, Session};
use crate::store::{LedgerStore, UnitOfWork};
use crate::types::{AppointmentId, DoseDelta};

/// Reverses a reservation: deletes the appointment, returns its dose and
/// re-offers its slot.
#[derive(Debug)]
pub struct CancellationEngine<'a, S> {
    store: &'a S,
}

impl<'a, S> CancellationEngine<'a, S>
where
    S: LedgerStore,
{
    /// Creates an engine over `store`.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Cancels appointment `id` on behalf of `requester`.
    ///
    /// Patients may cancel their own appointments and caregivers the ones
    /// they administer. Whoever cancels, the slot goes back on offer.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::AppointmentNotFound`] for an unknown identifier
    /// - [`SchedulerError::Unauthorized`] when `requester` is not a party to
    ///   the appointment
    /// - [`SchedulerError::InconsistentState`] when the appointment names a
    ///   vaccine missing from the inventory, or the cancellation could not be
    ///   undone
    #[instrument(
        name = "cancellation.cancel",
        skip_all,
        fields(requester = %requester.username(), role = %requester.role(), appointment_id = %id)
    )]
    pub async fn cancel(&self, requester: &Session, id: AppointmentId) -> Result<(), SchedulerError> {
        let mut unit = self.store.begin().await?;
        let mut journal = Journal::default();

        let outcome = revoke(&mut unit, &mut journal, requester, id).await;
        let appointment = finish(unit, journal, outcome, "cancel").await?;

        info!(
            caregiver = %appointment.caregiver,
            date = %appointment.date,
            vaccine = %appointment.vaccine,
            "[cancellation.committed] appointment cancelled"
        );
        Ok(())
    }
}

async fn revoke<U>(
    unit: &mut U,
    journal: &mut Journal,
    requester: &Session,
    id: AppointmentId,
) -> Result<Appointment, SchedulerError>
where
    U: UnitOfWork,
{
    let appointment = unit.find(id).await?;
    if !is_party(requester, &appointment) {
        warn!("[cancellation.refused] requester is not a party to the appointment");
        return Err(SchedulerError::Unauthorized(Action::Cancel));
    }

    unit.delete(id).await?;
    journal.record(Step::DeleteAppointment);

    unit.increment_stock(&appointment.vaccine, DoseDelta::one())
        .await
        .map_err(|error| match error {
            LedgerError::VaccineNotFound(vaccine) => {
                error!(
                    vaccine = %vaccine,
                    "[cancellation.inconsistent_state] appointment references a vaccine missing from the inventory"
                );
                SchedulerError::InconsistentState(format!(
                    "appointment {id} references vaccine {vaccine} missing from the inventory"
                ))
            }
            other => other.into(),
        })?;
    journal.record(Step::IncrementStock);

    unit.restore(&appointment.caregiver, appointment.date).await?;
    journal.record(Step::RestoreSlot);

    Ok(appointment)
}

fn is_party(requester: &Session, appointment: &Appointment) -> bool {
    match requester {
        Session::Patient(patient) => *patient == appointment.patient,
        Session::Caregiver(caregiver) => *caregiver == appointment.caregiver,
    }
}
