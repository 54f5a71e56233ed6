//! Walks through a morning at a vaccination clinic.
//!
//! This example shows:
//! - Stocking vaccines and offering caregiver dates
//! - Patients booking, with the earliest caregiver chosen for them
//! - Refusals rendered as user-facing messages
//! - Cancellation handing the dose and the slot back
//!
//! Run with `RUST_LOG=debug` to see every ledger step.

use vaxbook::{
    AppointmentDate, CaregiverId, DoseDelta, PatientId, Scheduler, SchedulerError, Session,
    VaccineName,
};
use vaxbook_memory::InMemoryLedgerStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vaxbook::logging::init()?;

    let scheduler = Scheduler::new(InMemoryLedgerStore::new());
    let date = AppointmentDate::parse("06-01-2024")?;
    let pfizer = VaccineName::parse("Pfizer")?;

    let alice = Session::Caregiver(CaregiverId::parse("alice")?);
    let bob = Session::Caregiver(CaregiverId::parse("bob")?);
    let _ = scheduler
        .add_doses(&alice, &pfizer, DoseDelta::parse("1")?)
        .await?;
    let _ = scheduler.upload_availability(&bob, date).await?;
    let _ = scheduler.upload_availability(&alice, date).await?;
    println!(
        "Caregivers on {date}: {:?}",
        scheduler.available_caregivers(date).await?
    );

    let p1 = Session::Patient(PatientId::parse("p1")?);
    let p2 = Session::Patient(PatientId::parse("p2")?);

    let booked = scheduler.reserve(&p1, date, &pfizer).await?;
    println!(
        "Appointment ID: {}, Caregiver username: {}",
        booked.id, booked.caregiver
    );

    match scheduler.reserve(&p2, date, &pfizer).await {
        Ok(appointment) => println!("Unexpected booking {}", appointment.id),
        Err(error) => println!("p2: {}", error.user_message()),
    }

    match scheduler.cancel(&p2, booked.id).await {
        Err(SchedulerError::Unauthorized(_)) => println!("p2 may not cancel appointment {}", booked.id),
        other => println!("Unexpected cancellation result {other:?}"),
    }

    scheduler.cancel(&p1, booked.id).await?;
    let stock = scheduler.stock(&pfizer).await?;
    println!("Cancelled {}; {} has {} doses left", booked.id, stock.name, stock.doses);
    println!(
        "Caregivers on {date}: {:?}",
        scheduler.available_caregivers(date).await?
    );

    let rebooked = scheduler.reserve(&p2, date, &pfizer).await?;
    println!(
        "Appointment ID: {}, Caregiver username: {}",
        rebooked.id, rebooked.caregiver
    );
    for appointment in scheduler.show_appointments(&p2).await? {
        println!(
            "{} {} {} {}",
            appointment.id,
            appointment.vaccine,
            appointment.date.to_command_line(),
            appointment.caregiver
        );
    }
    Ok(())
}
