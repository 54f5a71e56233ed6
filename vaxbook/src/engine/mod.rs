//! The transaction engines and the facade the command layer talks to.
//!
//! [`Scheduler`] is the only entry point most callers need. It checks the
//! caller's role, then hands multi-ledger work to the
//! [`ReservationEngine`] and [`CancellationEngine`]. Single-ledger writes and
//! read-only queries run in their own unit of work here.

mod cancellation;
mod journal;
mod reservation;

pub use cancellation::CancellationEngine;
pub use journal::Step;
pub use reservation::ReservationEngine;

use tracing::{info, instrument};

use crate::appointment::{Appointment, Schedule, Slot, Vaccine};
use crate::errors::SchedulerError;
use crate::ledger::{AppointmentLedger, AvailabilityRegistry, InventoryLedger};
use crate::session::{Action, Session};
use crate::store::{LedgerStore, UnitOfWork};
use crate::types::{AppointmentDate, AppointmentId, CaregiverId, DoseDelta, PatientId, VaccineName};
use journal::{conclude_read, finish, Journal};

/// Scheduling operations over one [`LedgerStore`].
///
/// The scheduler holds no per-caller state; share one instance (or one store
/// behind several instances) across every session.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Scheduler::new(InMemoryLedgerStore::new());
/// let caregiver = Session::from(CaregiverId::parse("A")?);
/// let patient = Session::from(PatientId::parse("p1")?);
/// let date = AppointmentDate::parse("06-01-2024")?;
/// let pfizer = VaccineName::parse("Pfizer")?;
///
/// scheduler.add_doses(&caregiver, &pfizer, DoseDelta::from_raw(5)?).await?;
/// scheduler.upload_availability(&caregiver, date).await?;
/// let appointment = scheduler.reserve(&patient, date, &pfizer).await?;
/// assert_eq!(appointment.caregiver.as_ref(), "A");
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler<S> {
    store: S,
}

impl<S> Scheduler<S>
where
    S: LedgerStore,
{
    /// Creates a scheduler over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the scheduler, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Books `vaccine` on `date` for the logged-in patient.
    pub async fn reserve(
        &self,
        session: &Session,
        date: AppointmentDate,
        vaccine: &VaccineName,
    ) -> Result<Appointment, SchedulerError> {
        let Some(patient) = session.as_patient() else {
            return Err(SchedulerError::Unauthorized(Action::Reserve));
        };
        ReservationEngine::new(&self.store)
            .reserve(patient, date, vaccine)
            .await
    }

    /// Cancels appointment `id` on behalf of either party to it.
    pub async fn cancel(&self, session: &Session, id: AppointmentId) -> Result<(), SchedulerError> {
        CancellationEngine::new(&self.store).cancel(session, id).await
    }

    /// Offers `date` for the logged-in caregiver.
    ///
    /// Refused with [`SchedulerError::SlotAlreadyOffered`] when the slot is
    /// already offered and [`SchedulerError::SlotBooked`] when the caregiver
    /// already has an appointment that day.
    #[instrument(
        name = "scheduler.upload_availability",
        skip_all,
        fields(caregiver = %session.username(), date = %date)
    )]
    pub async fn upload_availability(
        &self,
        session: &Session,
        date: AppointmentDate,
    ) -> Result<Slot, SchedulerError> {
        let Some(caregiver) = session.as_caregiver() else {
            return Err(SchedulerError::Unauthorized(Action::UploadAvailability));
        };

        let mut unit = self.store.begin().await?;
        let mut journal = Journal::default();
        let outcome = offer_slot(&mut unit, &mut journal, caregiver, date).await;
        let slot = finish(unit, journal, outcome, "upload_availability").await?;

        info!("[scheduler.slot_offered] availability uploaded");
        Ok(slot)
    }

    /// Adds `delta` doses of `vaccine`, creating it if needed.
    #[instrument(
        name = "scheduler.add_doses",
        skip_all,
        fields(caregiver = %session.username(), vaccine = %vaccine, delta = %delta)
    )]
    pub async fn add_doses(
        &self,
        session: &Session,
        vaccine: &VaccineName,
        delta: DoseDelta,
    ) -> Result<Vaccine, SchedulerError> {
        if session.as_caregiver().is_none() {
            return Err(SchedulerError::Unauthorized(Action::AddDoses));
        }

        let mut unit = self.store.begin().await?;
        let mut journal = Journal::default();
        let outcome = match unit.add_stock(vaccine, delta).await {
            Ok(doses) => {
                journal.record(Step::AddStock);
                Ok(Vaccine::new(vaccine.clone(), doses))
            }
            Err(error) => Err(SchedulerError::from(error)),
        };
        let record = finish(unit, journal, outcome, "add_doses").await?;

        info!(doses = %record.doses, "[scheduler.doses_added] inventory updated");
        Ok(record)
    }

    /// The caller's appointments: booked ones for a patient, administered
    /// ones for a caregiver.
    pub async fn show_appointments(
        &self,
        session: &Session,
    ) -> Result<Vec<Appointment>, SchedulerError> {
        match session {
            Session::Patient(patient) => self.list_for_patient(patient).await,
            Session::Caregiver(caregiver) => self.list_for_caregiver(caregiver).await,
        }
    }

    /// A patient's appointments in ascending identifier order.
    pub async fn list_for_patient(
        &self,
        patient: &PatientId,
    ) -> Result<Vec<Appointment>, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = unit
            .list_for_patient(patient)
            .await
            .map_err(SchedulerError::from);
        conclude_read(unit, outcome, "list_for_patient").await
    }

    /// A caregiver's appointments in ascending identifier order.
    pub async fn list_for_caregiver(
        &self,
        caregiver: &CaregiverId,
    ) -> Result<Vec<Appointment>, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = unit
            .list_for_caregiver(caregiver)
            .await
            .map_err(SchedulerError::from);
        conclude_read(unit, outcome, "list_for_caregiver").await
    }

    /// Current stock of `vaccine`.
    pub async fn stock(&self, vaccine: &VaccineName) -> Result<Vaccine, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = unit
            .get_stock(vaccine)
            .await
            .map(|doses| Vaccine::new(vaccine.clone(), doses))
            .map_err(SchedulerError::from);
        conclude_read(unit, outcome, "stock").await
    }

    /// Caregivers offering `date`, smallest identifier first.
    pub async fn available_caregivers(
        &self,
        date: AppointmentDate,
    ) -> Result<Vec<CaregiverId>, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = unit
            .list_for_date(date)
            .await
            .map_err(SchedulerError::from);
        conclude_read(unit, outcome, "available_caregivers").await
    }

    /// Every vaccine in the inventory, in name order.
    pub async fn vaccines(&self) -> Result<Vec<Vaccine>, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = unit.list_stock().await.map_err(SchedulerError::from);
        conclude_read(unit, outcome, "vaccines").await
    }

    /// Caregivers offering `date` together with the stock on hand, read from
    /// one unit of work.
    pub async fn schedule(&self, date: AppointmentDate) -> Result<Schedule, SchedulerError> {
        let mut unit = self.store.begin().await?;
        let outcome = read_schedule(&mut unit, date).await;
        conclude_read(unit, outcome, "schedule").await
    }
}

async fn read_schedule<U>(unit: &mut U, date: AppointmentDate) -> Result<Schedule, SchedulerError>
where
    U: UnitOfWork,
{
    let caregivers = unit.list_for_date(date).await?;
    let vaccines = unit.list_stock().await?;
    Ok(Schedule {
        date,
        caregivers,
        vaccines,
    })
}

async fn offer_slot<U>(
    unit: &mut U,
    journal: &mut Journal,
    caregiver: &CaregiverId,
    date: AppointmentDate,
) -> Result<Slot, SchedulerError>
where
    U: UnitOfWork,
{
    unit.offer(caregiver, date).await?;
    journal.record(Step::OfferSlot);
    Ok(Slot::new(caregiver.clone(), date))
}
