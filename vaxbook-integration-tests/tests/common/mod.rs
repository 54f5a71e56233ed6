//! Shared fixtures for vaxbook integration tests.

// Allow dead_code because not all test binaries use all exports from this module
#![allow(dead_code)]

use vaxbook::{
    AppointmentDate, CaregiverId, DoseDelta, LedgerStore, PatientId, Scheduler, Session,
    VaccineName,
};

pub fn patient(name: &str) -> Session {
    Session::Patient(PatientId::parse(name).expect("valid patient name"))
}

pub fn caregiver(name: &str) -> Session {
    Session::Caregiver(CaregiverId::parse(name).expect("valid caregiver name"))
}

pub fn caregiver_id(name: &str) -> CaregiverId {
    CaregiverId::parse(name).expect("valid caregiver name")
}

pub fn patient_id(name: &str) -> PatientId {
    PatientId::parse(name).expect("valid patient name")
}

pub fn vaccine(name: &str) -> VaccineName {
    VaccineName::parse(name).expect("valid vaccine name")
}

pub fn doses(amount: u32) -> DoseDelta {
    DoseDelta::from_raw(amount).expect("positive dose amount")
}

/// 2024-06-`day`.
pub fn june(day: u32) -> AppointmentDate {
    AppointmentDate::from_ymd(2024, 6, day).expect("valid June date")
}

/// Stocks `vaccine` with `amount` doses and has each caregiver offer `date`.
pub async fn stock_clinic<S>(
    scheduler: &Scheduler<S>,
    vaccine_name: &str,
    amount: u32,
    caregivers: &[&str],
    date: AppointmentDate,
) where
    S: LedgerStore,
{
    let admin = caregiver("clinic-admin");
    let _ = scheduler
        .add_doses(&admin, &vaccine(vaccine_name), doses(amount))
        .await
        .expect("stocking should succeed");
    for name in caregivers {
        let _ = scheduler
            .upload_availability(&caregiver(name), date)
            .await
            .expect("offering should succeed");
    }
}
