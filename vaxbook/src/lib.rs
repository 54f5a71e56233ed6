//! `vaxbook` - transactional core of a vaccination appointment scheduler
//!
//! Three ledgers hold the system's state: vaccine stock, offered caregiver
//! slots and booked appointments. A reservation consumes one slot and one
//! dose and records an appointment; a cancellation gives both back. Each of
//! those runs as a single unit of work, so the ledgers never disagree about
//! what was booked, even with many sessions racing for the same slot.
//!
//! Backends implement [`LedgerStore`]; see `vaxbook-memory` and
//! `vaxbook-postgres`. Callers drive everything through [`Scheduler`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod appointment;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod logging;
pub mod session;
pub mod store;
pub mod types;

pub use appointment::{Appointment, Schedule, Slot, Vaccine};
pub use engine::{CancellationEngine, ReservationEngine, Scheduler, Step};
pub use errors::{LedgerError, Operation, SchedulerError, StorageError, ValidationError};
pub use ledger::{AppointmentLedger, AvailabilityRegistry, InventoryLedger};
pub use session::{Action, Role, Session};
pub use store::{LedgerStore, UnitOfWork};
pub use types::{
    AppointmentDate, AppointmentId, CaregiverId, DoseCount, DoseDelta, PatientId, VaccineName,
};
