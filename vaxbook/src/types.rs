//! Core value types for the `vaxbook` scheduling engine.
//!
//! Identifiers and quantities use smart constructors so that a value, once
//! built, is known to be valid everywhere it travels ("parse, don't validate").

use std::num::{NonZeroU32, NonZeroU64};

use chrono::{Datelike, NaiveDate};
use nutype::nutype;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Username of a patient.
///
/// Trimmed, non-empty and at most 255 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct PatientId(String);

impl PatientId {
    /// Parses raw input into a `PatientId`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        Self::try_new(raw.into()).map_err(|error| ValidationError::InvalidIdentifier {
            kind: "patient",
            detail: error.to_string(),
        })
    }
}

/// Username of a caregiver.
///
/// The derived ordering is byte-wise string comparison; it is the order used
/// when several caregivers offer the same date.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CaregiverId(String);

impl CaregiverId {
    /// Parses raw input into a `CaregiverId`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        Self::try_new(raw.into()).map_err(|error| ValidationError::InvalidIdentifier {
            kind: "caregiver",
            detail: error.to_string(),
        })
    }
}

/// Name of a vaccine in the inventory. Case-sensitive.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct VaccineName(String);

impl VaccineName {
    /// Parses raw input into a `VaccineName`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        Self::try_new(raw.into()).map_err(|error| ValidationError::InvalidIdentifier {
            kind: "vaccine",
            detail: error.to_string(),
        })
    }
}

/// Identifier of a booked appointment.
///
/// Identifiers start at 1 and are handed out in strictly increasing order by
/// the appointment ledger. Zero is unrepresentable.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct AppointmentId(NonZeroU64);

impl AppointmentId {
    /// The identifier given to the first appointment a ledger ever holds.
    pub fn first() -> Self {
        Self::new(NonZeroU64::MIN)
    }

    /// Builds an identifier from a raw number, rejecting zero.
    pub fn from_raw(raw: u64) -> Result<Self, ValidationError> {
        NonZeroU64::new(raw)
            .map(Self::new)
            .ok_or_else(|| ValidationError::InvalidAppointmentId {
                raw: raw.to_string(),
            })
    }

    /// Parses user input such as `"7"`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidAppointmentId {
                raw: trimmed.to_string(),
            })
            .and_then(Self::from_raw)
    }

    /// The identifier that follows this one, or `None` on overflow.
    pub fn next(self) -> Option<Self> {
        self.into_inner().checked_add(1).map(Self::new)
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.into_inner().get()
    }
}

/// Number of doses currently in stock for a vaccine.
///
/// Unsigned, so the ledger floor of zero is enforced by the type.
#[nutype(
    default = 0,
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
pub struct DoseCount(u32);

impl DoseCount {
    /// An empty stock.
    pub fn zero() -> Self {
        Self::new(0)
    }

    /// Whether no doses remain.
    pub fn is_zero(self) -> bool {
        self.into_inner() == 0
    }

    /// Raw numeric value.
    pub fn get(self) -> u32 {
        self.into_inner()
    }

    /// Stock after adding `delta`, or `None` if the count would overflow.
    pub fn checked_add(self, delta: DoseDelta) -> Option<Self> {
        self.into_inner().checked_add(delta.get()).map(Self::new)
    }

    /// Stock after removing `delta`, or `None` if it would drop below zero.
    pub fn checked_sub(self, delta: DoseDelta) -> Option<Self> {
        self.into_inner().checked_sub(delta.get()).map(Self::new)
    }
}

impl From<DoseDelta> for DoseCount {
    fn from(delta: DoseDelta) -> Self {
        Self::new(delta.get())
    }
}

/// A strictly positive number of doses to add or remove.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct DoseDelta(NonZeroU32);

impl DoseDelta {
    /// A single dose, the amount consumed by one appointment.
    pub fn one() -> Self {
        Self::new(NonZeroU32::MIN)
    }

    /// Builds a delta from a raw number, rejecting zero.
    pub fn from_raw(raw: u32) -> Result<Self, ValidationError> {
        NonZeroU32::new(raw)
            .map(Self::new)
            .ok_or_else(|| ValidationError::InvalidDoseAmount {
                raw: raw.to_string(),
            })
    }

    /// Parses user input such as `"25"`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidDoseAmount {
                raw: trimmed.to_string(),
            })
            .and_then(Self::from_raw)
    }

    /// Raw numeric value.
    pub fn get(self) -> u32 {
        self.into_inner().get()
    }
}

/// Calendar date of an appointment or an offered slot.
///
/// Accepts the command-line form `MM-DD-YYYY` and ISO `YYYY-MM-DD`; both
/// require a four digit year. Displays as ISO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentDate(NaiveDate);

impl AppointmentDate {
    /// Wraps an already valid calendar date.
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from its parts, rejecting impossible dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, ValidationError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidDate {
                input: format!("{year:04}-{month:02}-{day:02}"),
            })
    }

    /// Parses `MM-DD-YYYY` or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let input = raw.trim();
        let invalid = || ValidationError::InvalidDate {
            input: input.to_string(),
        };

        let parts: Vec<&str> = input.split('-').collect();
        let [first, second, third] = parts[..] else {
            return Err(invalid());
        };
        if !parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid());
        }

        let number = |part: &str| part.parse::<u32>().map_err(|_| invalid());
        let (year, month, day) = match (first.len(), third.len()) {
            (4, 1..=2) if second.len() <= 2 => (number(first)?, number(second)?, number(third)?),
            (1..=2, 4) if second.len() <= 2 => (number(third)?, number(first)?, number(second)?),
            _ => return Err(invalid()),
        };
        let year = i32::try_from(year).map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// The underlying calendar date.
    pub const fn as_naive(&self) -> &NaiveDate {
        &self.0
    }

    /// Converts into the underlying calendar date.
    pub const fn into_naive(self) -> NaiveDate {
        self.0
    }

    /// Renders the date in the `MM-DD-YYYY` form used on the command line.
    pub fn to_command_line(&self) -> String {
        format!("{:02}-{:02}-{:04}", self.0.month(), self.0.day(), self.0.year())
    }
}

impl From<NaiveDate> for AppointmentDate {
    fn from(date: NaiveDate) -> Self {
        Self::new(date)
    }
}

impl From<AppointmentDate> for NaiveDate {
    fn from(date: AppointmentDate) -> Self {
        date.into_naive()
    }
}

impl std::str::FromStr for AppointmentDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AppointmentDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
