//! Behavioral contract every [`LedgerStore`] backend must satisfy.
//!
//! Each scenario uses freshly generated vaccine names, caregiver names and
//! dates, so scenarios can share one database without seeing each other's
//! rows. Run the whole suite against a backend with
//! [`ledger_contract_tests!`](crate::ledger_contract_tests).

use std::fmt;
use std::time::Duration;

use rand::{random, Rng};
use vaxbook::{
    Appointment, AppointmentDate, AppointmentId, AppointmentLedger, AvailabilityRegistry,
    CaregiverId, DoseCount, DoseDelta, InventoryLedger, LedgerError, LedgerStore, PatientId,
    StorageError, UnitOfWork, VaccineName,
};

/// A contract scenario that did not hold.
#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn storage(scenario: &'static str, phase: &'static str, error: StorageError) -> Self {
        Self::new(scenario, format!("{phase} returned unexpected error: {error}"))
    }

    fn ledger(scenario: &'static str, operation: &'static str, error: LedgerError) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn assertion(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self::new(scenario, detail)
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

/// Outcome of one contract scenario.
pub type ContractTestResult = Result<(), ContractTestFailure>;

/// Names and a date private to one scenario run.
struct Fixture {
    scenario: &'static str,
    tag: String,
    date: AppointmentDate,
}

impl Fixture {
    fn new(scenario: &'static str) -> Result<Self, ContractTestFailure> {
        let mut rng = rand::rng();
        let tag = format!("{scenario}-{:016x}", random::<u64>());
        let date = AppointmentDate::from_ymd(
            rng.random_range(2100..9000),
            rng.random_range(1..=12),
            rng.random_range(1..=28),
        )
        .map_err(|error| ContractTestFailure::assertion(scenario, error.to_string()))?;
        Ok(Self {
            scenario,
            tag,
            date,
        })
    }

    fn vaccine(&self, label: &str) -> Result<VaccineName, ContractTestFailure> {
        VaccineName::parse(format!("{label}-{}", self.tag))
            .map_err(|error| ContractTestFailure::assertion(self.scenario, error.to_string()))
    }

    fn caregiver(&self, label: &str) -> Result<CaregiverId, ContractTestFailure> {
        CaregiverId::parse(format!("{}-{label}", self.tag))
            .map_err(|error| ContractTestFailure::assertion(self.scenario, error.to_string()))
    }

    fn patient(&self, label: &str) -> Result<PatientId, ContractTestFailure> {
        PatientId::parse(format!("{}-{label}", self.tag))
            .map_err(|error| ContractTestFailure::assertion(self.scenario, error.to_string()))
    }

    async fn begin<S: LedgerStore>(&self, store: &S) -> Result<S::Unit, ContractTestFailure> {
        store
            .begin()
            .await
            .map_err(|error| ContractTestFailure::storage(self.scenario, "begin", error))
    }

    async fn commit<U: UnitOfWork>(&self, unit: U) -> ContractTestResult {
        unit.commit()
            .await
            .map_err(|error| ContractTestFailure::storage(self.scenario, "commit", error))
    }

    async fn rollback<U: UnitOfWork>(&self, unit: U) -> ContractTestResult {
        unit.rollback()
            .await
            .map_err(|error| ContractTestFailure::storage(self.scenario, "rollback", error))
    }

    fn check(&self, holds: bool, detail: impl FnOnce() -> String) -> ContractTestResult {
        if holds {
            Ok(())
        } else {
            Err(ContractTestFailure::assertion(self.scenario, detail()))
        }
    }
}

fn doses(scenario: &'static str, raw: u32) -> Result<DoseDelta, ContractTestFailure> {
    DoseDelta::from_raw(raw).map_err(|error| ContractTestFailure::assertion(scenario, error.to_string()))
}

/// Stock never goes below zero and a refused decrement changes nothing.
pub async fn test_stock_floor<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "stock_floor";
    let fx = Fixture::new(SCENARIO)?;
    let vaccine = fx.vaccine("Pfizer")?;
    let missing = fx.vaccine("Missing")?;

    let mut unit = fx.begin(store).await?;
    let created = unit
        .add_stock(&vaccine, doses(SCENARIO, 2)?)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "add_stock", error))?;
    fx.check(created == DoseCount::new(2), || {
        format!("add_stock on a new vaccine returned {created}, expected 2")
    })?;

    let refused = unit.decrement_stock(&vaccine, doses(SCENARIO, 3)?).await;
    fx.check(
        matches!(
            refused,
            Err(LedgerError::InsufficientStock { available, .. }) if available == DoseCount::new(2)
        ),
        || format!("decrement below zero returned {refused:?}"),
    )?;

    let remaining = unit
        .decrement_stock(&vaccine, doses(SCENARIO, 2)?)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "decrement_stock", error))?;
    fx.check(remaining.is_zero(), || {
        format!("decrement to zero left {remaining}")
    })?;

    let empty = unit.decrement_stock(&vaccine, DoseDelta::one()).await;
    fx.check(
        matches!(empty, Err(LedgerError::InsufficientStock { .. })),
        || format!("decrement of an empty vaccine returned {empty:?}"),
    )?;

    let lookup = unit.get_stock(&missing).await;
    fx.check(
        matches!(lookup, Err(LedgerError::VaccineNotFound(_))),
        || format!("get_stock of a missing vaccine returned {lookup:?}"),
    )?;

    let increment = unit.increment_stock(&missing, DoseDelta::one()).await;
    fx.check(
        matches!(increment, Err(LedgerError::VaccineNotFound(_))),
        || format!("increment_stock of a missing vaccine returned {increment:?}"),
    )?;
    fx.commit(unit).await?;

    let mut unit = fx.begin(store).await?;
    let stock = unit
        .get_stock(&vaccine)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "get_stock", error))?;
    fx.rollback(unit).await?;
    fx.check(stock.is_zero(), || {
        format!("committed stock was {stock}, expected 0")
    })
}

/// A slot is offered at most once, removed at most once and restorable.
pub async fn test_slot_lifecycle<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "slot_lifecycle";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver = fx.caregiver("A")?;

    let mut unit = fx.begin(store).await?;
    unit.offer(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "offer", error))?;

    let again = unit.offer(&caregiver, fx.date).await;
    fx.check(
        matches!(again, Err(LedgerError::SlotAlreadyOffered { .. })),
        || format!("second offer returned {again:?}"),
    )?;

    let offered = unit
        .is_offered(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "is_offered", error))?;
    fx.check(offered, || "offered slot is not reported as offered".into())?;

    unit.remove(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "remove", error))?;
    let gone = unit.remove(&caregiver, fx.date).await;
    fx.check(
        matches!(gone, Err(LedgerError::SlotNotFound { .. })),
        || format!("second remove returned {gone:?}"),
    )?;

    unit.restore(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "restore", error))?;
    unit.restore(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "restore", error))?;
    let listed = unit
        .list_for_date(fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "list_for_date", error))?;
    fx.commit(unit).await?;

    fx.check(listed == vec![caregiver.clone()], || {
        format!("restored slot listed as {listed:?}")
    })
}

/// The earliest caregiver is the byte-wise smallest identifier.
pub async fn test_earliest_caregiver_tie_break<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "earliest_caregiver_tie_break";
    let fx = Fixture::new(SCENARIO)?;
    let lower = fx.caregiver("a")?;
    let upper_b = fx.caregiver("B")?;
    let upper_a = fx.caregiver("A")?;

    let mut unit = fx.begin(store).await?;
    for caregiver in [&lower, &upper_b, &upper_a] {
        unit.offer(caregiver, fx.date)
            .await
            .map_err(|error| ContractTestFailure::ledger(SCENARIO, "offer", error))?;
    }
    fx.commit(unit).await?;

    let mut unit = fx.begin(store).await?;
    let earliest = unit
        .find_earliest(fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "find_earliest", error))?;
    let listed = unit
        .list_for_date(fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "list_for_date", error))?;
    fx.rollback(unit).await?;

    fx.check(earliest.as_ref() == Some(&upper_a), || {
        format!("find_earliest chose {earliest:?}, expected {upper_a}")
    })?;
    fx.check(listed == vec![upper_a.clone(), upper_b, lower], || {
        format!("list_for_date returned {listed:?}")
    })
}

/// Deleted appointment identifiers are never handed out again.
pub async fn test_appointment_ids_never_reused<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "appointment_ids_never_reused";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver = fx.caregiver("A")?;
    let patient = fx.patient("p1")?;
    let vaccine = fx.vaccine("Pfizer")?;

    let mut unit = fx.begin(store).await?;
    let first_id = unit
        .next_id()
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "next_id", error))?;
    let booked = Appointment::new(first_id, patient.clone(), caregiver.clone(), fx.date, vaccine.clone());
    unit.insert(&booked)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "insert", error))?;

    let duplicate = unit.insert(&booked).await;
    fx.check(
        matches!(duplicate, Err(LedgerError::DuplicateAppointmentId(id)) if id == first_id),
        || format!("inserting a live id returned {duplicate:?}"),
    )?;

    unit.delete(first_id)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "delete", error))?;
    let lookup = unit.find(first_id).await;
    fx.check(
        matches!(lookup, Err(LedgerError::AppointmentNotFound(_))),
        || format!("find after delete returned {lookup:?}"),
    )?;
    let deleted_again = unit.delete(first_id).await;
    fx.check(
        matches!(deleted_again, Err(LedgerError::AppointmentNotFound(_))),
        || format!("second delete returned {deleted_again:?}"),
    )?;

    let reused = unit.insert(&booked).await;
    fx.check(
        matches!(reused, Err(LedgerError::DuplicateAppointmentId(_))),
        || format!("re-inserting a deleted id returned {reused:?}"),
    )?;

    let second_id = unit
        .next_id()
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "next_id", error))?;
    fx.commit(unit).await?;

    fx.check(second_id > first_id, || {
        format!("next_id after deleting {first_id} returned {second_id}")
    })
}

/// Listings return only the party's appointments, in ascending id order.
pub async fn test_appointment_listing<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "appointment_listing";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver_a = fx.caregiver("A")?;
    let caregiver_b = fx.caregiver("B")?;
    let patient = fx.patient("p1")?;
    let other = fx.patient("p2")?;
    let vaccine = fx.vaccine("Pfizer")?;

    let mut unit = fx.begin(store).await?;
    let mut expected = Vec::new();
    for (who, caregiver) in [(&patient, &caregiver_b), (&other, &caregiver_a), (&patient, &caregiver_a)] {
        let id = unit
            .next_id()
            .await
            .map_err(|error| ContractTestFailure::ledger(SCENARIO, "next_id", error))?;
        let appointment = Appointment::new(id, who.clone(), caregiver.clone(), fx.date, vaccine.clone());
        unit.insert(&appointment)
            .await
            .map_err(|error| ContractTestFailure::ledger(SCENARIO, "insert", error))?;
        expected.push(appointment);
    }
    fx.commit(unit).await?;

    let mut unit = fx.begin(store).await?;
    let for_patient = unit
        .list_for_patient(&patient)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "list_for_patient", error))?;
    let for_caregiver = unit
        .list_for_caregiver(&caregiver_a)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "list_for_caregiver", error))?;
    let found = unit
        .find(expected[1].id)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "find", error))?;
    fx.rollback(unit).await?;

    let patient_ids: Vec<AppointmentId> = for_patient.iter().map(|a| a.id).collect();
    fx.check(patient_ids == vec![expected[0].id, expected[2].id], || {
        format!("list_for_patient returned ids {patient_ids:?}")
    })?;
    let caregiver_ids: Vec<AppointmentId> = for_caregiver.iter().map(|a| a.id).collect();
    fx.check(caregiver_ids == vec![expected[1].id, expected[2].id], || {
        format!("list_for_caregiver returned ids {caregiver_ids:?}")
    })?;
    fx.check(found == expected[1], || format!("find returned {found:?}"))
}

/// Rolling back or dropping a unit of work leaves no trace.
pub async fn test_rollback_discards_changes<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "rollback_discards_changes";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver = fx.caregiver("A")?;
    let patient = fx.patient("p1")?;
    let vaccine = fx.vaccine("Pfizer")?;

    let mut seed = fx.begin(store).await?;
    let _ = seed
        .add_stock(&vaccine, doses(SCENARIO, 5)?)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "add_stock", error))?;
    seed.offer(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "offer", error))?;
    fx.commit(seed).await?;

    let mut unit = fx.begin(store).await?;
    let id = unit
        .next_id()
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "next_id", error))?;
    unit.insert(&Appointment::new(id, patient.clone(), caregiver.clone(), fx.date, vaccine.clone()))
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "insert", error))?;
    unit.remove(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "remove", error))?;
    let _ = unit
        .decrement_stock(&vaccine, DoseDelta::one())
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "decrement_stock", error))?;
    fx.rollback(unit).await?;

    {
        let mut dropped = fx.begin(store).await?;
        let _ = dropped
            .decrement_stock(&vaccine, doses(SCENARIO, 5)?)
            .await
            .map_err(|error| ContractTestFailure::ledger(SCENARIO, "decrement_stock", error))?;
    }

    let mut unit = fx.begin(store).await?;
    let stock = unit
        .get_stock(&vaccine)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "get_stock", error))?;
    let offered = unit
        .is_offered(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "is_offered", error))?;
    let booked = unit
        .list_for_patient(&patient)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "list_for_patient", error))?;
    fx.rollback(unit).await?;

    fx.check(stock == DoseCount::new(5), || {
        format!("stock after rollback is {stock}, expected 5")
    })?;
    fx.check(offered, || "slot removed by a rolled-back unit is gone".into())?;
    fx.check(booked.is_empty(), || {
        format!("rolled-back appointment persisted: {booked:?}")
    })
}

/// Two units racing for the last dose: exactly one wins.
pub async fn test_concurrent_decrements_respect_floor<S: LedgerStore>(
    store: &S,
) -> ContractTestResult {
    const SCENARIO: &str = "concurrent_decrements_respect_floor";
    let fx = Fixture::new(SCENARIO)?;
    let vaccine = fx.vaccine("Pfizer")?;

    let mut seed = fx.begin(store).await?;
    let _ = seed
        .add_stock(&vaccine, DoseDelta::one())
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "add_stock", error))?;
    fx.commit(seed).await?;

    let (first, second) = tokio::join!(claim_dose(store, &vaccine), claim_dose(store, &vaccine));
    let first = first.map_err(|error| ContractTestFailure::ledger(SCENARIO, "claim", error))?;
    let second = second.map_err(|error| ContractTestFailure::ledger(SCENARIO, "claim", error))?;

    fx.check(first ^ second, || {
        format!("expected exactly one winner, got {first} and {second}")
    })?;

    let mut unit = fx.begin(store).await?;
    let stock = unit
        .get_stock(&vaccine)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "get_stock", error))?;
    fx.rollback(unit).await?;
    fx.check(stock.is_zero(), || format!("stock after race is {stock}"))
}

/// Two units racing for the only slot: exactly one wins.
pub async fn test_concurrent_slot_claims<S: LedgerStore>(store: &S) -> ContractTestResult {
    const SCENARIO: &str = "concurrent_slot_claims";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver = fx.caregiver("A")?;

    let mut seed = fx.begin(store).await?;
    seed.offer(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "offer", error))?;
    fx.commit(seed).await?;

    let (first, second) = tokio::join!(
        claim_slot(store, fx.date),
        claim_slot(store, fx.date)
    );
    let first = first.map_err(|error| ContractTestFailure::ledger(SCENARIO, "claim", error))?;
    let second = second.map_err(|error| ContractTestFailure::ledger(SCENARIO, "claim", error))?;

    fx.check(first ^ second, || {
        format!("expected exactly one winner, got {first} and {second}")
    })
}

/// A slot cannot be offered while an appointment holds it, even when the
/// offer starts before the booking commits.
pub async fn test_offer_waits_for_concurrent_booking<S: LedgerStore>(
    store: &S,
) -> ContractTestResult {
    const SCENARIO: &str = "offer_waits_for_concurrent_booking";
    let fx = Fixture::new(SCENARIO)?;
    let caregiver = fx.caregiver("A")?;
    let patient = fx.patient("p1")?;
    let vaccine = fx.vaccine("Pfizer")?;

    let mut seed = fx.begin(store).await?;
    seed.offer(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "offer", error))?;
    fx.commit(seed).await?;

    let mut booking = fx.begin(store).await?;
    booking
        .remove(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "remove", error))?;
    let id = booking
        .next_id()
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "next_id", error))?;
    booking
        .insert(&Appointment::new(id, patient, caregiver.clone(), fx.date, vaccine))
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "insert", error))?;

    let (committed, offered) = tokio::join!(
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            booking.commit().await
        },
        offer_slot(store, &caregiver, fx.date)
    );
    committed.map_err(|error| ContractTestFailure::storage(SCENARIO, "commit", error))?;
    fx.check(
        matches!(offered, Err(LedgerError::SlotBooked { .. })),
        || format!("offer racing a booking returned {offered:?}"),
    )?;

    let mut unit = fx.begin(store).await?;
    let still_offered = unit
        .is_offered(&caregiver, fx.date)
        .await
        .map_err(|error| ContractTestFailure::ledger(SCENARIO, "is_offered", error))?;
    fx.rollback(unit).await?;
    fx.check(!still_offered, || {
        "booked slot is offered again after a racing offer".into()
    })
}

async fn offer_slot<S: LedgerStore>(
    store: &S,
    caregiver: &CaregiverId,
    date: AppointmentDate,
) -> Result<(), LedgerError> {
    let mut unit = store.begin().await?;
    unit.offer(caregiver, date).await?;
    unit.commit().await?;
    Ok(())
}

async fn claim_dose<S: LedgerStore>(store: &S, vaccine: &VaccineName) -> Result<bool, LedgerError> {
    let mut unit = store.begin().await?;
    if unit.get_stock(vaccine).await?.is_zero() {
        return Ok(false);
    }
    match unit.decrement_stock(vaccine, DoseDelta::one()).await {
        Ok(_) => {
            unit.commit().await?;
            Ok(true)
        }
        Err(LedgerError::InsufficientStock { .. }) => Ok(false),
        Err(error) => Err(error),
    }
}

async fn claim_slot<S: LedgerStore>(store: &S, date: AppointmentDate) -> Result<bool, LedgerError> {
    let mut unit = store.begin().await?;
    let Some(chosen) = unit.find_earliest(date).await? else {
        return Ok(false);
    };
    match unit.remove(&chosen, date).await {
        Ok(()) => {
            unit.commit().await?;
            Ok(true)
        }
        Err(LedgerError::SlotNotFound { .. }) => Ok(false),
        Err(error) => Err(error),
    }
}

/// Generates one `#[tokio::test]` per contract scenario.
///
/// `make_store` is a closure returning a future that yields the store.
#[macro_export]
macro_rules! ledger_contract_tests {
    (@case $(#[$attr:meta])* $name:ident, $scenario:ident, $make_store:expr) => {
        #[tokio::test(flavor = "multi_thread")]
        $(#[$attr])*
        async fn $name() {
            let store = ($make_store)().await;
            $scenario(&store)
                .await
                .expect("ledger store contract failed");
        }
    };
    ($(#[$attr:meta])* suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        #[allow(non_snake_case, unused_imports)]
        mod $suite {
            use super::*;
            use $crate::contract::{
                test_appointment_ids_never_reused, test_appointment_listing,
                test_concurrent_decrements_respect_floor, test_concurrent_slot_claims,
                test_earliest_caregiver_tie_break, test_offer_waits_for_concurrent_booking,
                test_rollback_discards_changes, test_slot_lifecycle, test_stock_floor,
            };

            $crate::ledger_contract_tests!(@case $(#[$attr])* stock_floor_contract, test_stock_floor, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* slot_lifecycle_contract, test_slot_lifecycle, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* earliest_caregiver_tie_break_contract, test_earliest_caregiver_tie_break, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* appointment_ids_never_reused_contract, test_appointment_ids_never_reused, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* appointment_listing_contract, test_appointment_listing, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* rollback_discards_changes_contract, test_rollback_discards_changes, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* concurrent_decrements_respect_floor_contract, test_concurrent_decrements_respect_floor, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* concurrent_slot_claims_contract, test_concurrent_slot_claims, $make_store);
            $crate::ledger_contract_tests!(@case $(#[$attr])* offer_waits_for_concurrent_booking_contract, test_offer_waits_for_concurrent_booking, $make_store);
        }
    };
}

pub use ledger_contract_tests;
