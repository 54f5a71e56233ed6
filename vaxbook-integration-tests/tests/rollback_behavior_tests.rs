//! Rollback behavior verification tests.
//!
//! Each test stocks a clinic through a healthy store, then runs one operation
//! through a `ChaosStore` over the same ledgers and checks that a failure at
//! any step leaves the ledgers exactly as they were.

mod common;

use common::{caregiver, june, patient, stock_clinic, vaccine};
use vaxbook::{AppointmentId, DoseCount, Operation, SchedulerError, Scheduler, StorageError};
use vaxbook_memory::InMemoryLedgerStore;
use vaxbook_testing::{ChaosConfig, ChaosStore, ChaosStoreExt};
use tracing_test::traced_test;

async fn stocked_store() -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();
    let scheduler = Scheduler::new(store.clone());
    stock_clinic(&scheduler, "Pfizer", 3, &["A", "B"], june(1)).await;
    store
}

fn chaotic(store: &InMemoryLedgerStore, config: ChaosConfig) -> Scheduler<ChaosStore<InMemoryLedgerStore>> {
    Scheduler::new(store.clone().with_chaos(config))
}

async fn booked_store() -> (InMemoryLedgerStore, AppointmentId) {
    let store = stocked_store().await;
    let appointment = Scheduler::new(store.clone())
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    (store, appointment.id)
}

#[tokio::test]
async fn reservation_failing_at_each_step_leaves_ledgers_untouched() {
    for operation in [
        Operation::FindEarliestSlot,
        Operation::GetStock,
        Operation::NextAppointmentId,
        Operation::InsertAppointment,
        Operation::RemoveSlot,
        Operation::DecrementStock,
    ] {
        let store = stocked_store().await;
        let before = store.snapshot().await;
        let scheduler = chaotic(&store, ChaosConfig::default().fail_on(operation));

        let result = scheduler
            .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
            .await;

        assert_eq!(
            result,
            Err(SchedulerError::Storage(StorageError::new(
                operation,
                "injected failure"
            ))),
            "failure injected at {operation}"
        );
        assert_eq!(store.snapshot().await, before, "ledgers changed after {operation}");
        assert_eq!(store.last_assigned_id().await, None);
    }
}

#[tokio::test]
async fn cancellation_failing_at_each_step_leaves_ledgers_untouched() {
    for operation in [
        Operation::ReadAppointments,
        Operation::DeleteAppointment,
        Operation::IncrementStock,
        Operation::RestoreSlot,
    ] {
        let (store, id) = booked_store().await;
        let before = store.snapshot().await;
        let scheduler = chaotic(&store, ChaosConfig::default().fail_on(operation));

        let result = scheduler.cancel(&patient("p1"), id).await;

        assert!(
            matches!(result, Err(SchedulerError::Storage(ref error)) if error.operation == operation),
            "failure injected at {operation} gave {result:?}"
        );
        assert_eq!(store.snapshot().await, before, "ledgers changed after {operation}");
    }
}

#[tokio::test]
async fn failed_commit_discards_the_reservation() {
    let store = stocked_store().await;
    let before = store.snapshot().await;
    let scheduler = chaotic(&store, ChaosConfig::default().failing_commit());

    let result = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await;

    assert!(matches!(
        result,
        Err(SchedulerError::Storage(StorageError {
            operation: Operation::Commit,
            ..
        }))
    ));
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn failed_rollback_after_applied_steps_is_inconsistent() {
    let store = stocked_store().await;
    let scheduler = chaotic(
        &store,
        ChaosConfig::default()
            .fail_on(Operation::DecrementStock)
            .failing_rollback(),
    );

    let result = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await;

    let Err(SchedulerError::InconsistentState(detail)) = result else {
        panic!("expected inconsistent state, got {result:?}");
    };
    assert!(detail.contains("insert_appointment"), "{detail}");
    assert!(detail.contains("remove_slot"), "{detail}");
    assert_eq!(
        SchedulerError::InconsistentState(detail).user_message(),
        "Something went wrong and could not be undone. Please contact support!"
    );
}

#[tokio::test]
async fn failed_rollback_before_any_step_keeps_original_error() {
    let store = stocked_store().await;
    let before = store.snapshot().await;
    let scheduler = chaotic(&store, ChaosConfig::default().failing_rollback());

    let result = scheduler
        .reserve(&patient("p1"), june(2), &vaccine("Pfizer"))
        .await;

    assert_eq!(result, Err(SchedulerError::NoAvailability(june(2))));
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn refused_operations_under_chaos_roll_back_cleanly() {
    let (store, id) = booked_store().await;
    let before = store.snapshot().await;
    let scheduler = chaotic(&store, ChaosConfig::default().fail_on(Operation::OfferSlot));

    assert_eq!(
        scheduler.cancel(&caregiver("B"), id).await,
        Err(SchedulerError::Unauthorized(vaxbook::Action::Cancel))
    );
    assert!(matches!(
        scheduler.upload_availability(&caregiver("C"), june(2)).await,
        Err(SchedulerError::Storage(_))
    ));
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn begin_failure_is_surfaced_as_storage() {
    let store = stocked_store().await;
    let scheduler = chaotic(&store, ChaosConfig::default().fail_on(Operation::Begin));

    let result = scheduler.stock(&vaccine("Pfizer")).await;

    assert_eq!(
        result,
        Err(SchedulerError::Storage(StorageError::new(
            Operation::Begin,
            "injected failure"
        )))
    );
    assert_eq!(scheduler.store().injected_failures(), 1);
    assert_eq!(
        result.unwrap_err().user_message(),
        "Something went wrong. Please try again!"
    );
}

#[tokio::test]
#[traced_test]
async fn failed_release_of_a_read_is_logged_and_the_read_returned() {
    let store = stocked_store().await;
    let scheduler = chaotic(&store, ChaosConfig::default().failing_rollback());

    let stock = scheduler.stock(&vaccine("Pfizer")).await.unwrap();

    assert_eq!(stock.doses, DoseCount::new(3));
    assert_eq!(scheduler.store().injected_failures(), 1);
    assert!(logs_contain("[engine.read_release_failed]"));
    assert!(logs_contain("ERROR"));
}

#[tokio::test]
async fn random_failures_never_break_ledger_agreement() {
    let store = stocked_store().await;
    let scheduler = chaotic(
        &store,
        ChaosConfig::deterministic()
            .with_seed(7)
            .with_failure_probability(0.3),
    );

    for round in 0..40_u32 {
        let name = format!("p{round}");
        match scheduler
            .reserve(&patient(&name), june(1), &vaccine("Pfizer"))
            .await
        {
            Ok(appointment) => {
                let _ = scheduler.cancel(&patient(&name), appointment.id).await;
            }
            Err(SchedulerError::Storage(_) | SchedulerError::NoAvailability(_)) => {}
            Err(other) => panic!("unexpected error in round {round}: {other:?}"),
        }

        let snapshot = store.snapshot().await;
        let booked = u32::try_from(snapshot.appointments.len()).unwrap();
        let stock = snapshot.stock(&vaccine("Pfizer")).unwrap().get();
        assert_eq!(stock + booked, 3, "dose count drifted in round {round}");
        assert_eq!(
            snapshot.slots.len() + snapshot.appointments.len(),
            2,
            "slot count drifted in round {round}"
        );
    }
    assert!(scheduler.store().injected_failures() > 0);
}
