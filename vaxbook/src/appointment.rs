//! Records held by the three ledgers.

use serde::{Deserialize, Serialize};

use crate::types::{
    AppointmentDate, AppointmentId, CaregiverId, DoseCount, PatientId, VaccineName,
};

/// A vaccine and its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vaccine {
    /// Unique, case-sensitive name.
    pub name: VaccineName,
    /// Doses on hand.
    pub doses: DoseCount,
}

impl Vaccine {
    /// Creates a vaccine record.
    pub const fn new(name: VaccineName, doses: DoseCount) -> Self {
        Self { name, doses }
    }
}

/// Who can be booked on a date, and the stock they would administer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// The date searched.
    pub date: AppointmentDate,
    /// Caregivers offering the date, smallest identifier first.
    pub caregivers: Vec<CaregiverId>,
    /// Every stocked vaccine, in name order.
    pub vaccines: Vec<Vaccine>,
}

/// An unclaimed (caregiver, date) offering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// Offering caregiver.
    pub caregiver: CaregiverId,
    /// Offered date.
    pub date: AppointmentDate,
}

impl Slot {
    /// Creates a slot.
    pub const fn new(caregiver: CaregiverId, date: AppointmentDate) -> Self {
        Self { caregiver, date }
    }
}

/// A booked appointment binding one patient, one caregiver, one date and one
/// dose of one vaccine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appointment {
    /// Ledger-assigned identifier.
    pub id: AppointmentId,
    /// Patient who booked.
    pub patient: PatientId,
    /// Caregiver whose slot was consumed.
    pub caregiver: CaregiverId,
    /// Date of the appointment.
    pub date: AppointmentDate,
    /// Vaccine reserved for the appointment.
    pub vaccine: VaccineName,
}

impl Appointment {
    /// Creates an appointment record.
    pub const fn new(
        id: AppointmentId,
        patient: PatientId,
        caregiver: CaregiverId,
        date: AppointmentDate,
        vaccine: VaccineName,
    ) -> Self {
        Self {
            id,
            patient,
            caregiver,
            date,
            vaccine,
        }
    }

    /// The slot this appointment occupies.
    pub fn slot(&self) -> Slot {
        Slot::new(self.caregiver.clone(), self.date)
    }
}
