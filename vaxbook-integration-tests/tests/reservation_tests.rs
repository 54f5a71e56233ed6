//! Reservation behaviour against the in-memory backend.

mod common;

use common::{caregiver, caregiver_id, doses, june, patient, stock_clinic, vaccine};
use vaxbook::{Action, AppointmentId, DoseCount, SchedulerError, Scheduler, Vaccine};
use vaxbook_memory::InMemoryLedgerStore;

fn scheduler() -> Scheduler<InMemoryLedgerStore> {
    Scheduler::new(InMemoryLedgerStore::new())
}

#[tokio::test]
async fn booking_and_cancelling_the_last_pfizer_dose() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 1, &["A"], june(1)).await;
    let p1 = patient("p1");

    let appointment = scheduler
        .reserve(&p1, june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    assert_eq!(appointment.id, AppointmentId::first());
    assert_eq!(appointment.caregiver, caregiver_id("A"));
    assert_eq!(
        scheduler.stock(&vaccine("Pfizer")).await.unwrap().doses,
        DoseCount::zero()
    );

    let second = scheduler.reserve(&p1, june(1), &vaccine("Pfizer")).await;
    assert_eq!(second, Err(SchedulerError::NoAvailability(june(1))));

    scheduler.cancel(&p1, appointment.id).await.unwrap();
    assert_eq!(
        scheduler.stock(&vaccine("Pfizer")).await.unwrap().doses,
        DoseCount::new(1)
    );
    assert_eq!(
        scheduler.available_caregivers(june(1)).await.unwrap(),
        vec![caregiver_id("A")]
    );
}

#[tokio::test]
async fn earliest_caregiver_by_name_is_chosen() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Moderna", 5, &["carol", "Bob", "alice"], june(3)).await;

    let first = scheduler
        .reserve(&patient("p1"), june(3), &vaccine("Moderna"))
        .await
        .unwrap();
    let second = scheduler
        .reserve(&patient("p2"), june(3), &vaccine("Moderna"))
        .await
        .unwrap();
    let third = scheduler
        .reserve(&patient("p3"), june(3), &vaccine("Moderna"))
        .await
        .unwrap();

    // byte order puts upper case first
    assert_eq!(first.caregiver, caregiver_id("Bob"));
    assert_eq!(second.caregiver, caregiver_id("alice"));
    assert_eq!(third.caregiver, caregiver_id("carol"));
    assert!(first.id < second.id && second.id < third.id);
}

#[tokio::test]
async fn no_offer_on_date_is_no_availability() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 3, &["A"], june(1)).await;

    let result = scheduler
        .reserve(&patient("p1"), june(2), &vaccine("Pfizer"))
        .await;

    assert_eq!(result, Err(SchedulerError::NoAvailability(june(2))));
    assert!(scheduler.store().snapshot().await.appointments.is_empty());
}

#[tokio::test]
async fn unknown_vaccine_leaves_slot_offered() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 3, &["A"], june(1)).await;

    let result = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("pfizer"))
        .await;

    assert_eq!(result, Err(SchedulerError::UnknownVaccine(vaccine("pfizer"))));
    let snapshot = scheduler.store().snapshot().await;
    assert!(snapshot.is_offered(&caregiver_id("A"), june(1)));
    assert!(snapshot.appointments.is_empty());
}

#[tokio::test]
async fn empty_stock_is_no_stock() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 1, &["A", "B"], june(1)).await;
    let _ = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    let result = scheduler
        .reserve(&patient("p2"), june(1), &vaccine("Pfizer"))
        .await;

    assert_eq!(result, Err(SchedulerError::NoStock(vaccine("Pfizer"))));
    let snapshot = scheduler.store().snapshot().await;
    assert!(snapshot.is_offered(&caregiver_id("B"), june(1)));
    assert_eq!(snapshot.appointments.len(), 1);
}

#[tokio::test]
async fn caregivers_cannot_reserve() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 1, &["A"], june(1)).await;

    let result = scheduler
        .reserve(&caregiver("B"), june(1), &vaccine("Pfizer"))
        .await;

    assert_eq!(result, Err(SchedulerError::Unauthorized(Action::Reserve)));
    assert_eq!(
        result.unwrap_err().user_message(),
        "You need to be logged in as a patient to reserve!"
    );
}

#[tokio::test]
async fn identifiers_keep_rising_after_cancellation() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 10, &["A", "B"], june(1)).await;
    let p1 = patient("p1");

    let first = scheduler
        .reserve(&p1, june(1), &vaccine("Pfizer"))
        .await
        .unwrap();
    scheduler.cancel(&p1, first.id).await.unwrap();
    let second = scheduler
        .reserve(&p1, june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    assert!(second.id > first.id);
    assert_eq!(second.caregiver, first.caregiver);
}

#[tokio::test]
async fn patient_and_caregiver_views_list_the_same_booking() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 4, &["A"], june(1)).await;
    stock_clinic(&scheduler, "Pfizer", 1, &["A"], june(2)).await;
    let p1 = patient("p1");

    let first = scheduler
        .reserve(&p1, june(2), &vaccine("Pfizer"))
        .await
        .unwrap();
    let second = scheduler
        .reserve(&p1, june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    let mine = scheduler.show_appointments(&p1).await.unwrap();
    assert_eq!(mine, vec![first.clone(), second.clone()]);
    let administered = scheduler.show_appointments(&caregiver("A")).await.unwrap();
    assert_eq!(administered, vec![first, second]);
    assert!(scheduler
        .show_appointments(&patient("p2"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn booked_caregiver_cannot_reoffer_the_day() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 1, &["A"], june(1)).await;
    let _ = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    let result = scheduler.upload_availability(&caregiver("A"), june(1)).await;

    assert_eq!(
        result,
        Err(SchedulerError::SlotBooked {
            caregiver: caregiver_id("A"),
            date: june(1),
        })
    );
}

#[tokio::test]
async fn offering_twice_is_refused() {
    let scheduler = scheduler();
    let a = caregiver("A");
    let _ = scheduler.upload_availability(&a, june(1)).await.unwrap();

    let result = scheduler.upload_availability(&a, june(1)).await;

    assert_eq!(
        result,
        Err(SchedulerError::SlotAlreadyOffered {
            caregiver: caregiver_id("A"),
            date: june(1),
        })
    );
}

#[tokio::test]
async fn schedule_lists_caregivers_with_every_vaccine() {
    let scheduler = scheduler();
    stock_clinic(&scheduler, "Pfizer", 2, &["carol", "Bob"], june(1)).await;
    stock_clinic(&scheduler, "Moderna", 1, &["alice"], june(2)).await;
    let _ = scheduler
        .reserve(&patient("p1"), june(1), &vaccine("Pfizer"))
        .await
        .unwrap();

    let schedule = scheduler.schedule(june(1)).await.unwrap();

    assert_eq!(schedule.date, june(1));
    assert_eq!(schedule.caregivers, vec![caregiver_id("carol")]);
    assert_eq!(
        schedule.vaccines,
        vec![
            Vaccine::new(vaccine("Moderna"), DoseCount::new(1)),
            Vaccine::new(vaccine("Pfizer"), DoseCount::new(1)),
        ]
    );
    assert_eq!(scheduler.vaccines().await.unwrap(), schedule.vaccines);
    assert!(scheduler.schedule(june(3)).await.unwrap().caregivers.is_empty());
}

#[tokio::test]
async fn patients_cannot_manage_inventory_or_availability() {
    let scheduler = scheduler();
    let p1 = patient("p1");

    assert_eq!(
        scheduler
            .add_doses(&p1, &vaccine("Pfizer"), doses(5))
            .await,
        Err(SchedulerError::Unauthorized(Action::AddDoses))
    );
    assert_eq!(
        scheduler.upload_availability(&p1, june(1)).await,
        Err(SchedulerError::Unauthorized(Action::UploadAvailability))
    );
    assert_eq!(
        scheduler.stock(&vaccine("Pfizer")).await,
        Err(SchedulerError::UnknownVaccine(vaccine("Pfizer")))
    );
}

#[tokio::test]
async fn adding_doses_accumulates() {
    let scheduler = scheduler();
    let admin = caregiver("A");

    let created = scheduler
        .add_doses(&admin, &vaccine("Pfizer"), doses(3))
        .await
        .unwrap();
    let topped_up = scheduler
        .add_doses(&admin, &vaccine("Pfizer"), doses(4))
        .await
        .unwrap();

    assert_eq!(created.doses, DoseCount::new(3));
    assert_eq!(topped_up.doses, DoseCount::new(7));
    let full = scheduler
        .add_doses(&admin, &vaccine("Pfizer"), doses(u32::MAX))
        .await;
    assert_eq!(full, Err(SchedulerError::StockOverflow(vaccine("Pfizer"))));
    assert_eq!(
        scheduler.stock(&vaccine("Pfizer")).await.unwrap().doses,
        DoseCount::new(7)
    );
}
