use sqlx::postgres::PgRow;
use sqlx::{query, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use vaxbook::{
    Appointment, AppointmentDate, AppointmentId, AppointmentLedger, AvailabilityRegistry,
    CaregiverId, DoseCount, DoseDelta, InventoryLedger, LedgerError, Operation, PatientId,
    StorageError, UnitOfWork, Vaccine, VaccineName,
};

use crate::map_sqlx_error;

/// Largest stock the `vaccines.doses` column accepts.
const MAX_DOSES: i64 = 4_294_967_295;

/// A unit of work running inside one PostgreSQL transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresUnit {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PostgresUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresUnit").finish_non_exhaustive()
    }
}

impl PostgresUnit {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    async fn current_stock(
        &mut self,
        vaccine: &VaccineName,
        operation: Operation,
    ) -> Result<Option<DoseCount>, LedgerError> {
        let row = query("SELECT doses FROM vaccines WHERE name = $1")
            .bind(vaccine.as_ref())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, operation))?;
        row.map(|row| dose_count(&row, operation)).transpose()
    }

    async fn fetch_appointments(
        &mut self,
        column: &'static str,
        party: &str,
    ) -> Result<Vec<Appointment>, LedgerError> {
        // column is one of two literals, never user input
        let sql = format!(
            "SELECT id, patient, caregiver, slot_date, vaccine FROM appointments \
             WHERE {column} = $1 ORDER BY id"
        );
        let rows = query(&sql)
            .bind(party)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::ReadAppointments))?;
        rows.iter()
            .map(appointment_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::from)
    }
}

impl UnitOfWork for PostgresUnit {
    #[instrument(name = "postgres.commit", skip_all)]
    async fn commit(self) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Commit))
    }

    #[instrument(name = "postgres.rollback", skip_all)]
    async fn rollback(self) -> Result<(), StorageError> {
        self.tx
            .rollback()
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Rollback))
    }
}

impl InventoryLedger for PostgresUnit {
    async fn get_stock(&mut self, vaccine: &VaccineName) -> Result<DoseCount, LedgerError> {
        self.current_stock(vaccine, Operation::GetStock)
            .await?
            .ok_or_else(|| LedgerError::VaccineNotFound(vaccine.clone()))
    }

    async fn list_stock(&mut self) -> Result<Vec<Vaccine>, LedgerError> {
        let rows = query(r#"SELECT name, doses FROM vaccines ORDER BY name COLLATE "C""#)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::GetStock))?;
        rows.iter()
            .map(|row| -> Result<Vaccine, LedgerError> {
                let raw: String = row
                    .try_get("name")
                    .map_err(|error| map_sqlx_error(error, Operation::GetStock))?;
                let name = VaccineName::parse(raw)
                    .map_err(|error| StorageError::new(Operation::GetStock, error.to_string()))?;
                Ok(Vaccine::new(name, dose_count(row, Operation::GetStock)?))
            })
            .collect()
    }

    async fn add_stock(
        &mut self,
        vaccine: &VaccineName,
        delta: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        let row = query(
            "INSERT INTO vaccines (name, doses) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET doses = vaccines.doses + EXCLUDED.doses
             WHERE vaccines.doses + EXCLUDED.doses <= $3
             RETURNING doses",
        )
        .bind(vaccine.as_ref())
        .bind(i64::from(delta.get()))
        .bind(MAX_DOSES)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::AddStock))?;

        let Some(row) = row else {
            return Err(LedgerError::StockOverflow(vaccine.clone()));
        };
        let doses = dose_count(&row, Operation::AddStock)?;
        debug!(vaccine = %vaccine, doses = %doses, "[postgres.stock_added] inventory updated");
        Ok(doses)
    }

    async fn decrement_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        let row = query(
            "UPDATE vaccines SET doses = doses - $2
             WHERE name = $1 AND doses >= $2
             RETURNING doses",
        )
        .bind(vaccine.as_ref())
        .bind(i64::from(amount.get()))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::DecrementStock))?;

        if let Some(row) = row {
            return dose_count(&row, Operation::DecrementStock);
        }
        match self.current_stock(vaccine, Operation::DecrementStock).await? {
            None => Err(LedgerError::VaccineNotFound(vaccine.clone())),
            Some(available) => Err(LedgerError::InsufficientStock {
                vaccine: vaccine.clone(),
                available,
                requested: amount,
            }),
        }
    }

    async fn increment_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        let row = query(
            "UPDATE vaccines SET doses = doses + $2
             WHERE name = $1 AND doses + $2 <= $3
             RETURNING doses",
        )
        .bind(vaccine.as_ref())
        .bind(i64::from(amount.get()))
        .bind(MAX_DOSES)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::IncrementStock))?;

        if let Some(row) = row {
            return dose_count(&row, Operation::IncrementStock);
        }
        match self.current_stock(vaccine, Operation::IncrementStock).await? {
            None => Err(LedgerError::VaccineNotFound(vaccine.clone())),
            Some(_) => Err(LedgerError::StockOverflow(vaccine.clone())),
        }
    }
}

impl AvailabilityRegistry for PostgresUnit {
    async fn offer(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        lock_slot(&mut self.tx, caregiver, date, Operation::OfferSlot).await?;
        // statement snapshot is taken after the lock, so a reservation that
        // held it has committed its appointment by now
        let result = query(
            "INSERT INTO availabilities (caregiver, slot_date)
             SELECT $1::text, $2::date
             WHERE NOT EXISTS (
                 SELECT 1 FROM appointments WHERE caregiver = $1 AND slot_date = $2
             )
             ON CONFLICT (caregiver, slot_date) DO NOTHING",
        )
        .bind(caregiver.as_ref())
        .bind(date.into_naive())
        .execute(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::OfferSlot))?;
        if result.rows_affected() == 1 {
            return Ok(());
        }

        let booked = query(
            "SELECT EXISTS (SELECT 1 FROM appointments WHERE caregiver = $1 AND slot_date = $2)",
        )
        .bind(caregiver.as_ref())
        .bind(date.into_naive())
        .fetch_one(&mut *self.tx)
        .await
        .and_then(|row| row.try_get::<bool, _>(0))
        .map_err(|error| map_sqlx_error(error, Operation::OfferSlot))?;
        let caregiver = caregiver.clone();
        if booked {
            Err(LedgerError::SlotBooked { caregiver, date })
        } else {
            Err(LedgerError::SlotAlreadyOffered { caregiver, date })
        }
    }

    async fn find_earliest(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Option<CaregiverId>, LedgerError> {
        let row = query(
            r#"SELECT caregiver FROM availabilities
               WHERE slot_date = $1
               ORDER BY caregiver COLLATE "C"
               LIMIT 1
               FOR UPDATE SKIP LOCKED"#,
        )
        .bind(date.into_naive())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::FindEarliestSlot))?;

        row.map(|row| caregiver_from_row(&row, Operation::FindEarliestSlot))
            .transpose()
            .map_err(LedgerError::from)
    }

    async fn remove(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        lock_slot(&mut self.tx, caregiver, date, Operation::RemoveSlot).await?;
        let result = query("DELETE FROM availabilities WHERE caregiver = $1 AND slot_date = $2")
            .bind(caregiver.as_ref())
            .bind(date.into_naive())
            .execute(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::RemoveSlot))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::SlotNotFound {
                caregiver: caregiver.clone(),
                date,
            });
        }
        Ok(())
    }

    async fn restore(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        lock_slot(&mut self.tx, caregiver, date, Operation::RestoreSlot).await?;
        query(
            "INSERT INTO availabilities (caregiver, slot_date) VALUES ($1, $2)
             ON CONFLICT (caregiver, slot_date) DO NOTHING",
        )
        .bind(caregiver.as_ref())
        .bind(date.into_naive())
        .execute(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::RestoreSlot))?;
        Ok(())
    }

    async fn is_offered(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<bool, LedgerError> {
        let row = query(
            "SELECT EXISTS (SELECT 1 FROM availabilities WHERE caregiver = $1 AND slot_date = $2)",
        )
        .bind(caregiver.as_ref())
        .bind(date.into_naive())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ReadSlots))?;
        row.try_get::<bool, _>(0)
            .map_err(|error| LedgerError::from(map_sqlx_error(error, Operation::ReadSlots)))
    }

    async fn list_for_date(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Vec<CaregiverId>, LedgerError> {
        let rows = query(
            r#"SELECT caregiver FROM availabilities
               WHERE slot_date = $1
               ORDER BY caregiver COLLATE "C""#,
        )
        .bind(date.into_naive())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ReadSlots))?;

        rows.iter()
            .map(|row| caregiver_from_row(row, Operation::ReadSlots))
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::from)
    }
}

impl AppointmentLedger for PostgresUnit {
    async fn next_id(&mut self) -> Result<AppointmentId, LedgerError> {
        let row = query("SELECT last_id FROM appointment_id_high_water WHERE singleton FOR UPDATE")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::NextAppointmentId))?;
        let last: i64 = row
            .try_get("last_id")
            .map_err(|error| map_sqlx_error(error, Operation::NextAppointmentId))?;

        if last == i64::MAX {
            return Err(LedgerError::IdentifiersExhausted);
        }
        appointment_id(last + 1, Operation::NextAppointmentId).map_err(LedgerError::from)
    }

    async fn insert(&mut self, appointment: &Appointment) -> Result<(), LedgerError> {
        let id = appointment.id;
        let raw_id = i64::try_from(id.get()).map_err(|_| LedgerError::IdentifiersExhausted)?;

        let raised = query(
            "UPDATE appointment_id_high_water SET last_id = $1 WHERE singleton AND last_id < $1",
        )
        .bind(raw_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::InsertAppointment))?;
        if raised.rows_affected() == 0 {
            return Err(LedgerError::DuplicateAppointmentId(id));
        }

        let inserted = query(
            "INSERT INTO appointments (id, patient, caregiver, slot_date, vaccine)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(raw_id)
        .bind(appointment.patient.as_ref())
        .bind(appointment.caregiver.as_ref())
        .bind(appointment.date.into_naive())
        .bind(appointment.vaccine.as_ref())
        .execute(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::InsertAppointment))?;
        if inserted.rows_affected() == 0 {
            return Err(LedgerError::DuplicateAppointmentId(id));
        }

        debug!(appointment_id = %id, "[postgres.appointment_inserted] appointment stored");
        Ok(())
    }

    async fn find(&mut self, id: AppointmentId) -> Result<Appointment, LedgerError> {
        let raw_id = i64::try_from(id.get()).map_err(|_| LedgerError::AppointmentNotFound(id))?;
        let row = query(
            "SELECT id, patient, caregiver, slot_date, vaccine FROM appointments WHERE id = $1",
        )
        .bind(raw_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|error| map_sqlx_error(error, Operation::ReadAppointments))?;

        match row {
            Some(row) => appointment_from_row(&row).map_err(LedgerError::from),
            None => Err(LedgerError::AppointmentNotFound(id)),
        }
    }

    async fn delete(&mut self, id: AppointmentId) -> Result<(), LedgerError> {
        let raw_id = i64::try_from(id.get()).map_err(|_| LedgerError::AppointmentNotFound(id))?;
        let result = query("DELETE FROM appointments WHERE id = $1")
            .bind(raw_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::DeleteAppointment))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::AppointmentNotFound(id));
        }
        Ok(())
    }

    async fn list_for_patient(
        &mut self,
        patient: &PatientId,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.fetch_appointments("patient", patient.as_ref()).await
    }

    async fn list_for_caregiver(
        &mut self,
        caregiver: &CaregiverId,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.fetch_appointments("caregiver", caregiver.as_ref()).await
    }
}

/// Serializes every slot mutation on one (caregiver, date) pair until the
/// transaction ends.
///
/// Offering checks the appointment ledger before inserting. Without this lock
/// an offer could read no appointment while a reservation's delete of the
/// same slot is still uncommitted, then insert once that delete commits.
async fn lock_slot(
    tx: &mut Transaction<'static, Postgres>,
    caregiver: &CaregiverId,
    date: AppointmentDate,
    operation: Operation,
) -> Result<(), StorageError> {
    query("SELECT pg_advisory_xact_lock(hashtextextended($1 || '|' || $2::date::text, 0))")
        .bind(caregiver.as_ref())
        .bind(date.into_naive())
        .execute(&mut **tx)
        .await
        .map_err(|error| map_sqlx_error(error, operation))?;
    Ok(())
}

fn dose_count(row: &PgRow, operation: Operation) -> Result<DoseCount, LedgerError> {
    let raw: i64 = row
        .try_get("doses")
        .map_err(|error| map_sqlx_error(error, operation))?;
    u32::try_from(raw)
        .map(DoseCount::new)
        .map_err(|_| StorageError::new(operation, format!("stock {raw} out of range")).into())
}

fn appointment_id(raw: i64, operation: Operation) -> Result<AppointmentId, StorageError> {
    u64::try_from(raw)
        .ok()
        .and_then(|raw| AppointmentId::from_raw(raw).ok())
        .ok_or_else(|| StorageError::new(operation, format!("invalid appointment id {raw}")))
}

fn caregiver_from_row(row: &PgRow, operation: Operation) -> Result<CaregiverId, StorageError> {
    let raw: String = row
        .try_get("caregiver")
        .map_err(|error| map_sqlx_error(error, operation))?;
    CaregiverId::parse(raw).map_err(|error| StorageError::new(operation, error.to_string()))
}

fn appointment_from_row(row: &PgRow) -> Result<Appointment, StorageError> {
    const OPERATION: Operation = Operation::ReadAppointments;
    let column = |error: sqlx::Error| map_sqlx_error(error, OPERATION);
    let invalid = |error: vaxbook::ValidationError| StorageError::new(OPERATION, error.to_string());

    let id = appointment_id(row.try_get("id").map_err(column)?, OPERATION)?;
    let patient = PatientId::parse(row.try_get::<String, _>("patient").map_err(column)?)
        .map_err(invalid)?;
    let caregiver = CaregiverId::parse(row.try_get::<String, _>("caregiver").map_err(column)?)
        .map_err(invalid)?;
    let date: chrono::NaiveDate = row.try_get("slot_date").map_err(column)?;
    let vaccine = VaccineName::parse(row.try_get::<String, _>("vaccine").map_err(column)?)
        .map_err(invalid)?;

    Ok(Appointment::new(
        id,
        patient,
        caregiver,
        AppointmentDate::new(date),
        vaccine,
    ))
}
