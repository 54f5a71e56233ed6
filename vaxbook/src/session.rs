//! The authenticated caller.
//!
//! Login handling produces a [`Session`]; every scheduler operation takes one
//! explicitly. The engine holds no login state of its own, so any number of
//! sessions can run against one store at the same time.

use serde::{Deserialize, Serialize};

use crate::types::{CaregiverId, PatientId};

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A patient booking appointments for themselves.
    Patient,
    /// A caregiver offering availability and administering doses.
    Caregiver,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patient => f.write_str("patient"),
            Self::Caregiver => f.write_str("caregiver"),
        }
    }
}

/// An authenticated caller and the role they logged in with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "username", rename_all = "snake_case")]
pub enum Session {
    /// Logged in as a patient.
    Patient(PatientId),
    /// Logged in as a caregiver.
    Caregiver(CaregiverId),
}

impl Session {
    /// Role of the caller.
    pub const fn role(&self) -> Role {
        match self {
            Self::Patient(_) => Role::Patient,
            Self::Caregiver(_) => Role::Caregiver,
        }
    }

    /// Username of the caller, whatever their role.
    pub fn username(&self) -> &str {
        match self {
            Self::Patient(patient) => patient.as_ref(),
            Self::Caregiver(caregiver) => caregiver.as_ref(),
        }
    }

    /// The patient identity, if logged in as a patient.
    pub const fn as_patient(&self) -> Option<&PatientId> {
        match self {
            Self::Patient(patient) => Some(patient),
            Self::Caregiver(_) => None,
        }
    }

    /// The caregiver identity, if logged in as a caregiver.
    pub const fn as_caregiver(&self) -> Option<&CaregiverId> {
        match self {
            Self::Caregiver(caregiver) => Some(caregiver),
            Self::Patient(_) => None,
        }
    }
}

impl From<PatientId> for Session {
    fn from(patient: PatientId) -> Self {
        Self::Patient(patient)
    }
}

impl From<CaregiverId> for Session {
    fn from(caregiver: CaregiverId) -> Self {
        Self::Caregiver(caregiver)
    }
}

/// A mutating action that is subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Booking an appointment.
    Reserve,
    /// Cancelling an appointment.
    Cancel,
    /// Offering a date.
    UploadAvailability,
    /// Adding vaccine doses.
    AddDoses,
}

impl Action {
    /// Text shown when the action is refused.
    pub const fn refusal_message(self) -> &'static str {
        match self {
            Self::Reserve => "You need to be logged in as a patient to reserve!",
            Self::Cancel => "Cancellation refused.",
            Self::UploadAvailability | Self::AddDoses => "Please login as a caregiver first!",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reserve => f.write_str("reserve"),
            Self::Cancel => f.write_str("cancel"),
            Self::UploadAvailability => f.write_str("upload availability"),
            Self::AddDoses => f.write_str("add doses"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_reports_role_and_username() {
        let patient = Session::from(PatientId::parse("p1").unwrap());
        let caregiver = Session::from(CaregiverId::parse("A").unwrap());

        assert_eq!(patient.role(), Role::Patient);
        assert_eq!(patient.username(), "p1");
        assert!(patient.as_caregiver().is_none());

        assert_eq!(caregiver.role(), Role::Caregiver);
        assert_eq!(caregiver.username(), "A");
        assert!(caregiver.as_patient().is_none());
    }

    #[test]
    fn patient_and_caregiver_with_same_name_are_distinct() {
        let patient = Session::from(PatientId::parse("sam").unwrap());
        let caregiver = Session::from(CaregiverId::parse("sam").unwrap());
        assert_ne!(patient, caregiver);
    }

    #[test]
    fn session_serializes_with_role_tag() {
        let session = Session::from(CaregiverId::parse("A").unwrap());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "role": "caregiver", "username": "A" })
        );
    }
}
