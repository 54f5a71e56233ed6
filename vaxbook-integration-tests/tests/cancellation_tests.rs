//! Cancellation behaviour against the in-memory backend.

mod common;

use common::{caregiver, caregiver_id, june, patient, stock_clinic, vaccine};
use vaxbook::{
    Action, AppointmentId, AppointmentLedger, DoseCount, InventoryLedger, LedgerStore,
    SchedulerError, Scheduler, UnitOfWork,
};
use vaxbook_memory::InMemoryLedgerStore;
use tracing_test::traced_test;

async fn booked_clinic() -> (Scheduler<InMemoryLedgerStore>, AppointmentId) {
    let scheduler = Scheduler::new(InMemoryLedgerStore::new());
    stock_clinic(&scheduler, "Pfizer", 2, &["A"], june(1)).await;
    let appointment = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    (scheduler, appointment.id)
}

#[tokio::test]
async fn caregiver_cancellation_reoffers_the_slot() {
    let (scheduler, id) = booked_clinic().await;

    scheduler.cancel(&caregiver("A"), id).await.unwrap();

    let snapshot = scheduler.store().snapshot().await;
    assert!(snapshot.appointments.is_empty());
    assert!(snapshot.is_offered(&caregiver_id("A"), june(1)));
    assert_eq!(snapshot.stock(&vaccine("Pfizer")), Some(DoseCount::new(2)));

    let rebooked = scheduler
        .reserve(&patient("p2"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    assert_eq!(rebooked.caregiver, caregiver_id("A"));
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let (scheduler, id) = booked_clinic().await;
    let missing = id.next().unwrap();

    let result = scheduler.cancel(&patient("p1"), missing).await;

    assert_eq!(result, Err(SchedulerError::AppointmentNotFound(missing)));
}

#[tokio::test]
async fn strangers_are_refused_without_side_effects() {
    let (scheduler, id) = booked_clinic().await;
    let before = scheduler.store().snapshot().await;

    for stranger in [patient("p2"), caregiver("B"), caregiver("p1"), patient("A")] {
        let result = scheduler.cancel(&stranger, id).await;
        assert_eq!(result, Err(SchedulerError::Unauthorized(Action::Cancel)));
    }

    assert_eq!(scheduler.store().snapshot().await, before);
}

#[tokio::test]
async fn second_cancellation_is_not_found() {
    let (scheduler, id) = booked_clinic().await;
    let p1 = patient("p1");

    scheduler.cancel(&p1, id).await.unwrap();
    let again = scheduler.cancel(&p1, id).await;

    assert_eq!(again, Err(SchedulerError::AppointmentNotFound(id)));
    assert_eq!(
        scheduler.store().snapshot().await.stock(&vaccine("Pfizer")),
        Some(DoseCount::new(2))
    );
}

#[tokio::test]
async fn cancellation_restores_stock_exactly_once_per_appointment() {
    let scheduler = Scheduler::new(InMemoryLedgerStore::new());
    stock_clinic(&scheduler, "Pfizer", 2, &["A", "B"], june(1)).await;

    let first = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    let second = scheduler
        .reserve(&patient("p2"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    assert!(scheduler
        .store()
        .snapshot()
        .await
        .stock(&vaccine("Pfizer"))
        .is_some_and(DoseCount::is_zero));

    scheduler.cancel(&patient("p2"), second.id).await.unwrap();
    scheduler.cancel(&caregiver("A"), first.id).await.unwrap();

    let snapshot = scheduler.store().snapshot().await;
    assert_eq!(snapshot.stock(&vaccine("Pfizer")), Some(DoseCount::new(2)));
    assert!(snapshot.is_offered(&caregiver_id("A"), june(1)));
    assert!(snapshot.is_offered(&caregiver_id("B"), june(1)));
}

#[tokio::test]
#[traced_test]
async fn appointment_for_vanished_vaccine_is_inconsistent() {
    let store = InMemoryLedgerStore::new();
    let scheduler = Scheduler::new(store.clone());
    stock_clinic(&scheduler, "Pfizer", 1, &["A"], june(1)).await;
    let booked = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    // Rewrite the appointment so that it names a vaccine the inventory never held.
    let mut unit = store.begin().await.unwrap();
    unit.delete(booked.id).await.unwrap();
    let mut orphan = booked.clone();
    orphan.id = unit.next_id().await.unwrap();
    orphan.vaccine = vaccine("Novavax");
    unit.insert(&orphan).await.unwrap();
    assert!(unit.get_stock(&vaccine("Novavax")).await.is_err());
    unit.commit().await.unwrap();
    let before = store.snapshot().await;

    let result = scheduler.cancel(&patient("p1"), orphan.id).await;

    assert!(matches!(result, Err(SchedulerError::InconsistentState(_))));
    assert_eq!(store.snapshot().await, before);
    assert!(logs_contain("[cancellation.inconsistent_state]"));
}
