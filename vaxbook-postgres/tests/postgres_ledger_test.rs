mod common;

use chrono::NaiveDate;
use common::PostgresTestFixture;
use sqlx::Row;
use vaxbook::{
    Appointment, AppointmentDate, AppointmentId, AppointmentLedger, AvailabilityRegistry,
    CaregiverId, DoseDelta, InventoryLedger, LedgerError, LedgerStore, PatientId, UnitOfWork, VaccineName,
};
use vaxbook_postgres::PostgresLedgerStore;

fn date() -> AppointmentDate {
    AppointmentDate::new(NaiveDate::from_ymd_opt(2031, 3, 14).unwrap())
}

fn appointment(id: AppointmentId) -> Appointment {
    Appointment::new(
        id,
        PatientId::parse("pg-patient").unwrap(),
        CaregiverId::parse("pg-caregiver").unwrap(),
        date(),
        VaccineName::parse("pg-vaccine").unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires Docker"]
async fn migrations_are_idempotent() {
    let fixture = PostgresTestFixture::new().await;

    fixture.store.migrate().await.unwrap();
    fixture.store.ping().await.unwrap();

    let row = sqlx::query("SELECT count(*) AS rows FROM appointment_id_high_water")
        .fetch_one(fixture.store.pool())
        .await
        .unwrap();
    let rows: i64 = row.try_get("rows").unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires Docker"]
async fn high_water_mark_survives_reconnect_after_delete() {
    let fixture = PostgresTestFixture::new().await;

    let mut unit = fixture.begin().await.unwrap();
    let first = unit.next_id().await.unwrap();
    unit.insert(&appointment(first)).await.unwrap();
    unit.commit().await.unwrap();

    let mut unit = fixture.begin().await.unwrap();
    unit.delete(first).await.unwrap();
    unit.commit().await.unwrap();

    let reconnected = PostgresLedgerStore::new(fixture.connection_string.clone())
        .await
        .unwrap();
    let mut unit = reconnected.begin().await.unwrap();
    let next = unit.next_id().await.unwrap();
    assert!(next > first);
    assert_eq!(
        unit.insert(&appointment(first)).await,
        Err(LedgerError::DuplicateAppointmentId(first))
    );
    unit.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires Docker"]
async fn refused_operation_keeps_transaction_usable() {
    let fixture = PostgresTestFixture::new().await;
    let vaccine = VaccineName::parse("pg-usable").unwrap();

    let mut unit = fixture.begin().await.unwrap();
    let _ = unit
        .add_stock(&vaccine, DoseDelta::from_raw(1).unwrap())
        .await
        .unwrap();
    let refused = unit
        .decrement_stock(&vaccine, DoseDelta::from_raw(2).unwrap())
        .await;
    assert!(matches!(refused, Err(LedgerError::InsufficientStock { .. })));

    let left = unit
        .decrement_stock(&vaccine, DoseDelta::one())
        .await
        .unwrap();
    assert!(left.is_zero());
    unit.commit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires Docker"]
async fn booked_pair_refuses_offer_inside_one_transaction() {
    let fixture = PostgresTestFixture::new().await;
    let caregiver = CaregiverId::parse("pg-booked").unwrap();

    let mut unit = fixture.begin().await.unwrap();
    let id = unit.next_id().await.unwrap();
    let mut booked = appointment(id);
    booked.caregiver = caregiver.clone();
    unit.insert(&booked).await.unwrap();

    assert_eq!(
        unit.offer(&caregiver, date()).await,
        Err(LedgerError::SlotBooked {
            caregiver: caregiver.clone(),
            date: date(),
        })
    );
    assert!(!unit.is_offered(&caregiver, date()).await.unwrap());

    unit.delete(id).await.unwrap();
    unit.offer(&caregiver, date()).await.unwrap();
    assert_eq!(
        unit.offer(&caregiver, date()).await,
        Err(LedgerError::SlotAlreadyOffered {
            caregiver,
            date: date(),
        })
    );
    unit.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires Docker"]
async fn stock_column_rejects_overflow() {
    let fixture = PostgresTestFixture::new().await;
    let vaccine = VaccineName::parse("pg-overflow").unwrap();

    let mut unit = fixture.begin().await.unwrap();
    let _ = unit
        .add_stock(&vaccine, DoseDelta::from_raw(u32::MAX).unwrap())
        .await
        .unwrap();
    assert_eq!(
        unit.add_stock(&vaccine, DoseDelta::one()).await,
        Err(LedgerError::StockOverflow(vaccine.clone()))
    );
    assert_eq!(
        unit.increment_stock(&vaccine, DoseDelta::one()).await,
        Err(LedgerError::StockOverflow(vaccine.clone()))
    );
    assert_eq!(unit.get_stock(&vaccine).await.unwrap().get(), u32::MAX);
    unit.rollback().await.unwrap();
}
