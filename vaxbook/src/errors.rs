//! Error types for the scheduling engine.
//!
//! Errors are layered the same way the engine is:
//!
//! - **`StorageError`**: a persistence primitive failed (connection, lock,
//!   driver). Always surfaced, never swallowed.
//! - **`LedgerError`**: a single ledger operation was refused (missing
//!   record, stock floor, duplicate slot or identifier) or hit storage.
//! - **`ValidationError`**: malformed input reached the core. Upstream input
//!   handling should normally catch these first.
//! - **`SchedulerError`**: the discriminated result handed to the command
//!   layer. Every variant has a stable user-facing message via
//!   [`SchedulerError::user_message`].

use thiserror::Error;

use crate::session::Action;
use crate::types::{
    AppointmentDate, AppointmentId, CaregiverId, DoseCount, DoseDelta, VaccineName,
};

/// The persistence primitive that was running when a storage failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Opening a unit of work.
    Begin,
    /// Committing a unit of work.
    Commit,
    /// Rolling back a unit of work.
    Rollback,
    /// Reading a vaccine's stock.
    GetStock,
    /// Adding doses to a vaccine.
    AddStock,
    /// Consuming doses.
    DecrementStock,
    /// Returning doses.
    IncrementStock,
    /// Offering a slot.
    OfferSlot,
    /// Selecting the first open slot on a date.
    FindEarliestSlot,
    /// Consuming a slot.
    RemoveSlot,
    /// Re-offering a slot.
    RestoreSlot,
    /// Reading offered slots.
    ReadSlots,
    /// Allocating an appointment identifier.
    NextAppointmentId,
    /// Writing an appointment.
    InsertAppointment,
    /// Reading appointments.
    ReadAppointments,
    /// Deleting an appointment.
    DeleteAppointment,
    /// Applying schema migrations.
    Migrate,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::GetStock => "get_stock",
            Self::AddStock => "add_stock",
            Self::DecrementStock => "decrement_stock",
            Self::IncrementStock => "increment_stock",
            Self::OfferSlot => "offer_slot",
            Self::FindEarliestSlot => "find_earliest_slot",
            Self::RemoveSlot => "remove_slot",
            Self::RestoreSlot => "restore_slot",
            Self::ReadSlots => "read_slots",
            Self::NextAppointmentId => "next_appointment_id",
            Self::InsertAppointment => "insert_appointment",
            Self::ReadAppointments => "read_appointments",
            Self::DeleteAppointment => "delete_appointment",
            Self::Migrate => "migrate",
        };
        f.write_str(name)
    }
}

/// A failure of the underlying persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} operation failed: {detail}")]
pub struct StorageError {
    /// The primitive that failed.
    pub operation: Operation,
    /// Backend-specific description. Never shown to end users.
    pub detail: String,
}

impl StorageError {
    /// Creates a storage error for `operation`.
    pub fn new(operation: Operation, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }
}

/// Errors returned by the individual ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No inventory record exists for the vaccine.
    #[error("vaccine {0} not found")]
    VaccineNotFound(VaccineName),

    /// A decrement would have taken stock below zero. Nothing was changed.
    #[error("insufficient stock of {vaccine}: {available} available, {requested} requested")]
    InsufficientStock {
        /// The vaccine being consumed.
        vaccine: VaccineName,
        /// Stock at the time of the request.
        available: DoseCount,
        /// Doses requested.
        requested: DoseDelta,
    },

    /// Adding doses would exceed the representable stock.
    #[error("stock of {0} would overflow")]
    StockOverflow(VaccineName),

    /// The caregiver already offers this date.
    #[error("caregiver {caregiver} already offers {date}")]
    SlotAlreadyOffered {
        /// Offering caregiver.
        caregiver: CaregiverId,
        /// Offered date.
        date: AppointmentDate,
    },

    /// The caregiver already has an appointment on this date.
    #[error("caregiver {caregiver} is already booked on {date}")]
    SlotBooked {
        /// Booked caregiver.
        caregiver: CaregiverId,
        /// Booked date.
        date: AppointmentDate,
    },

    /// The slot is not currently offered.
    #[error("caregiver {caregiver} does not offer {date}")]
    SlotNotFound {
        /// Caregiver of the missing slot.
        caregiver: CaregiverId,
        /// Date of the missing slot.
        date: AppointmentDate,
    },

    /// No appointment with this identifier exists.
    #[error("appointment {0} not found")]
    AppointmentNotFound(AppointmentId),

    /// The identifier is live or has been assigned before.
    #[error("appointment id {0} has already been assigned")]
    DuplicateAppointmentId(AppointmentId),

    /// The identifier space is exhausted.
    #[error("appointment identifiers exhausted")]
    IdentifiersExhausted,

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Malformed input reaching the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not a calendar-valid `MM-DD-YYYY` or `YYYY-MM-DD` date.
    #[error("invalid date: {input:?}")]
    InvalidDate {
        /// The rejected input.
        input: String,
    },

    /// An identifier failed its constraints.
    #[error("invalid {kind} identifier: {detail}")]
    InvalidIdentifier {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// Constraint that failed.
        detail: String,
    },

    /// Not a positive appointment number.
    #[error("invalid appointment id: {raw:?}")]
    InvalidAppointmentId {
        /// The rejected input.
        raw: String,
    },

    /// Not a positive number of doses.
    #[error("invalid dose amount: {raw:?}")]
    InvalidDoseAmount {
        /// The rejected input.
        raw: String,
    },
}

impl ValidationError {
    /// Stable text suitable for showing to the user.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidDate { .. } => "Please enter a valid date!",
            Self::InvalidIdentifier { .. } => "Please enter a valid name!",
            Self::InvalidAppointmentId { .. } => "Please enter a valid appointment ID!",
            Self::InvalidDoseAmount { .. } => "Please enter a positive number of doses!",
        }
    }
}

/// Result of every operation exposed to the command layer.
///
/// # Handling
///
/// - **`NoAvailability` / `NoStock` / `UnknownVaccine`**: report and let the
///   user pick another date or vaccine.
/// - **`Unauthorized`**: the session's role may not perform the action, or the
///   caller does not own the appointment. Carries no appointment details.
/// - **`Storage`**: transient; the operation had no effect and may be retried.
/// - **`InconsistentState`**: the engine could not restore the ledgers after a
///   failure. Stop and investigate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No appointment with this identifier exists.
    #[error("appointment {0} not found")]
    AppointmentNotFound(AppointmentId),

    /// The caregiver already offers this date.
    #[error("caregiver {caregiver} already offers {date}")]
    SlotAlreadyOffered {
        /// Offering caregiver.
        caregiver: CaregiverId,
        /// Offered date.
        date: AppointmentDate,
    },

    /// The caregiver already has an appointment booked on this date.
    #[error("caregiver {caregiver} is already booked on {date}")]
    SlotBooked {
        /// Booked caregiver.
        caregiver: CaregiverId,
        /// Booked date.
        date: AppointmentDate,
    },

    /// The appointment identifier was already assigned.
    #[error("appointment id {0} has already been assigned")]
    DuplicateId(AppointmentId),

    /// The vaccine is not in the inventory.
    #[error("unknown vaccine {0}")]
    UnknownVaccine(VaccineName),

    /// The vaccine is in the inventory with zero doses.
    #[error("no doses of {0} in stock")]
    NoStock(VaccineName),

    /// Fewer doses are in stock than were requested.
    #[error("insufficient stock of {vaccine}: {available} available, {requested} requested")]
    InsufficientStock {
        /// The vaccine being consumed.
        vaccine: VaccineName,
        /// Stock at the time of the request.
        available: DoseCount,
        /// Doses requested.
        requested: DoseDelta,
    },

    /// Adding doses would exceed the representable stock.
    #[error("stock of {0} would overflow")]
    StockOverflow(VaccineName),

    /// No caregiver offers the requested date.
    #[error("no caregiver available on {0}")]
    NoAvailability(AppointmentDate),

    /// The session may not perform the action.
    #[error("not authorized to {0}")]
    Unauthorized(Action),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing store failed; the operation had no effect.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The ledgers may disagree with each other.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

impl SchedulerError {
    /// Stable, specific text suitable for showing to the user.
    ///
    /// Storage and consistency failures render generic text; driver messages
    /// never leave the engine.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::AppointmentNotFound(_) => "Sorry, but couldn't find any appointment!",
            Self::SlotAlreadyOffered { .. } => "Availability for that date was already uploaded!",
            Self::SlotBooked { .. } => "You already have an appointment on that date!",
            Self::DuplicateId(_) => "Could not allocate an appointment ID. Please try again!",
            Self::UnknownVaccine(_) => "We do not have this vaccine. Please try again!",
            Self::NoStock(_) | Self::InsufficientStock { .. } => "Not enough available doses!",
            Self::StockOverflow(_) => "Too many doses for a single vaccine. Please try again!",
            Self::NoAvailability(_) => "No Caregiver is available!",
            Self::Unauthorized(action) => action.refusal_message(),
            Self::Validation(error) => error.user_message(),
            Self::Storage(_) => "Something went wrong. Please try again!",
            Self::InconsistentState(_) => {
                "Something went wrong and could not be undone. Please contact support!"
            }
        }
    }
}

impl From<LedgerError> for SchedulerError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::VaccineNotFound(vaccine) => Self::UnknownVaccine(vaccine),
            LedgerError::InsufficientStock {
                vaccine,
                available,
                requested,
            } => {
                if available.is_zero() {
                    Self::NoStock(vaccine)
                } else {
                    Self::InsufficientStock {
                        vaccine,
                        available,
                        requested,
                    }
                }
            }
            LedgerError::StockOverflow(vaccine) => Self::StockOverflow(vaccine),
            LedgerError::SlotAlreadyOffered { caregiver, date } => {
                Self::SlotAlreadyOffered { caregiver, date }
            }
            LedgerError::SlotBooked { caregiver, date } => Self::SlotBooked { caregiver, date },
            LedgerError::SlotNotFound { date, .. } => Self::NoAvailability(date),
            LedgerError::AppointmentNotFound(id) => Self::AppointmentNotFound(id),
            LedgerError::DuplicateAppointmentId(id) => Self::DuplicateId(id),
            LedgerError::IdentifiersExhausted => Self::Storage(StorageError::new(
                Operation::NextAppointmentId,
                "appointment identifiers exhausted",
            )),
            LedgerError::Storage(error) => Self::Storage(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppointmentId;

    fn vaccine() -> VaccineName {
        VaccineName::parse("Pfizer").unwrap()
    }

    #[test]
    fn storage_error_display_names_the_operation() {
        let error = StorageError::new(Operation::DecrementStock, "connection reset");
        assert_eq!(
            error.to_string(),
            "decrement_stock operation failed: connection reset"
        );
    }

    #[test]
    fn empty_stock_maps_to_no_stock() {
        let error = SchedulerError::from(LedgerError::InsufficientStock {
            vaccine: vaccine(),
            available: DoseCount::zero(),
            requested: DoseDelta::one(),
        });
        assert_eq!(error, SchedulerError::NoStock(vaccine()));
    }

    #[test]
    fn partial_stock_keeps_counts() {
        let error = SchedulerError::from(LedgerError::InsufficientStock {
            vaccine: vaccine(),
            available: DoseCount::new(2),
            requested: DoseDelta::from_raw(5).unwrap(),
        });
        assert!(matches!(
            error,
            SchedulerError::InsufficientStock { available, .. } if available.get() == 2
        ));
    }

    #[test]
    fn missing_vaccine_maps_to_unknown_vaccine() {
        let error = SchedulerError::from(LedgerError::VaccineNotFound(vaccine()));
        assert_eq!(error, SchedulerError::UnknownVaccine(vaccine()));
    }

    #[test]
    fn booked_slot_keeps_caregiver_and_date() {
        let caregiver = CaregiverId::parse("A").unwrap();
        let date = AppointmentDate::from_ymd(2024, 6, 1).unwrap();
        let error = SchedulerError::from(LedgerError::SlotBooked {
            caregiver: caregiver.clone(),
            date,
        });
        assert_eq!(error, SchedulerError::SlotBooked { caregiver, date });
    }

    #[test]
    fn storage_messages_hide_driver_text() {
        let error = SchedulerError::from(StorageError::new(
            Operation::Commit,
            "FATAL: password authentication failed for user \"admin\"",
        ));
        assert!(!error.user_message().contains("password"));
        assert!(!error.user_message().contains("admin"));

        let inconsistent = SchedulerError::InconsistentState("rollback failed: disk full".into());
        assert!(!inconsistent.user_message().contains("disk"));
    }

    #[test]
    fn user_messages_are_stable() {
        let date = crate::types::AppointmentDate::from_ymd(2024, 6, 1).unwrap();
        insta::assert_snapshot!(
            SchedulerError::NoAvailability(date).user_message(),
            @"No Caregiver is available!"
        );
        insta::assert_snapshot!(
            SchedulerError::UnknownVaccine(vaccine()).user_message(),
            @"We do not have this vaccine. Please try again!"
        );
        insta::assert_snapshot!(
            SchedulerError::NoStock(vaccine()).user_message(),
            @"Not enough available doses!"
        );
        insta::assert_snapshot!(
            SchedulerError::AppointmentNotFound(AppointmentId::first()).user_message(),
            @"Sorry, but couldn't find any appointment!"
        );
        insta::assert_snapshot!(
            SchedulerError::Unauthorized(Action::Cancel).user_message(),
            @"Cancellation refused."
        );
    }
}
