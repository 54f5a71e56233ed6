use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nutype::nutype;
use parking_lot::Mutex;
use rand::{random, rngs::StdRng, Rng, SeedableRng};
use tracing::warn;
use vaxbook::{
    Appointment, AppointmentDate, AppointmentId, AppointmentLedger, AvailabilityRegistry,
    CaregiverId, DoseCount, DoseDelta, InventoryLedger, LedgerError, LedgerStore, Operation,
    PatientId, StorageError, UnitOfWork, Vaccine, VaccineName,
};

/// Probability value for failure injection rates.
///
/// Probability represents a value in the range [0.0, 1.0] where 0.0 means
/// never inject failures and 1.0 means always inject failures.
///
/// # Examples
///
/// ```ignore
/// use vaxbook_testing::chaos::Probability;
///
/// let never = Probability::try_new(0.0).unwrap();
/// let always = Probability::try_new(1.0).unwrap();
///
/// // Values outside [0.0, 1.0] are rejected
/// assert!(Probability::try_new(1.5).is_err());
/// ```
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Into)
)]
pub struct Probability(f32);

impl Probability {
    fn clamped(probability: f32) -> Self {
        if probability.is_nan() {
            return Self::never();
        }
        Self::try_new(probability.clamp(0.0, 1.0)).expect("clamped value is always valid")
    }

    fn never() -> Self {
        Self::try_new(0.0).expect("0.0 is valid probability")
    }
}

/// Which operations a [`ChaosStore`] fails, and how.
///
/// Operations named with [`ChaosConfig::fail_on`] fail every time. The
/// random failure probability applies to every operation except
/// [`Operation::Rollback`], which only fails when named explicitly.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    deterministic_seed: Option<u64>,
    failure_probability: Probability,
    failing_operations: HashSet<Operation>,
}

impl ChaosConfig {
    /// A configuration with a fixed seed, so random failures repeat run to run.
    pub fn deterministic() -> Self {
        Self {
            deterministic_seed: Some(0),
            ..Self::default()
        }
    }

    /// Seeds the random failure generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.deterministic_seed = Some(seed);
        self
    }

    /// Fails each operation with `probability`, clamped to [0.0, 1.0].
    pub fn with_failure_probability(mut self, probability: f32) -> Self {
        self.failure_probability = Probability::clamped(probability);
        self
    }

    /// Fails every call of `operation`.
    pub fn fail_on(mut self, operation: Operation) -> Self {
        let _ = self.failing_operations.insert(operation);
        self
    }

    /// Fails every rollback. The failed unit's changes are committed, as if
    /// the undo never happened.
    pub fn failing_rollback(self) -> Self {
        self.fail_on(Operation::Rollback)
    }

    /// Fails every commit; the unit's changes are discarded.
    pub fn failing_commit(self) -> Self {
        self.fail_on(Operation::Commit)
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            failure_probability: Probability::never(),
            failing_operations: HashSet::new(),
        }
    }
}

/// Wraps any [`LedgerStore`] in a [`ChaosStore`].
pub trait ChaosStoreExt: Sized {
    /// Wraps `self` with failure injection.
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self>;
}

#[derive(Debug)]
struct Injector {
    config: ChaosConfig,
    rng: Mutex<StdRng>,
    injected: AtomicUsize,
}

impl Injector {
    fn should_inject(&self, operation: Operation) -> bool {
        if self.config.failing_operations.contains(&operation) {
            return true;
        }
        if operation == Operation::Rollback {
            return false;
        }

        let prob_f32: f32 = self.config.failure_probability.into();
        if prob_f32 <= 0.0 {
            return false;
        }
        if prob_f32 >= 1.0 {
            return true;
        }

        self.rng.lock().random_bool(f64::from(prob_f32))
    }

    fn check(&self, operation: Operation) -> Result<(), StorageError> {
        if !self.should_inject(operation) {
            return Ok(());
        }
        let _ = self.injected.fetch_add(1, Ordering::Relaxed);
        warn!(operation = %operation, "[chaos.injected] failing storage operation");
        Err(StorageError::new(operation, "injected failure"))
    }
}

/// A [`LedgerStore`] wrapper that fails chosen operations.
#[derive(Debug)]
pub struct ChaosStore<S> {
    store: S,
    injector: Arc<Injector>,
}

impl<S> ChaosStore<S> {
    /// Wraps `store`.
    pub fn new(store: S, config: ChaosConfig) -> Self {
        let rng = match config.deterministic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(random()),
        };

        Self {
            store,
            injector: Arc::new(Injector {
                config,
                rng: Mutex::new(rng),
                injected: AtomicUsize::new(0),
            }),
        }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.store
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        self.injector.injected.load(Ordering::Relaxed)
    }
}

impl<S> LedgerStore for ChaosStore<S>
where
    S: LedgerStore,
{
    type Unit = ChaosUnit<S::Unit>;

    async fn begin(&self) -> Result<Self::Unit, StorageError> {
        self.injector.check(Operation::Begin)?;
        let unit = self.store.begin().await?;
        Ok(ChaosUnit {
            unit,
            injector: Arc::clone(&self.injector),
        })
    }
}

impl<S> ChaosStoreExt for S
where
    S: LedgerStore,
{
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self> {
        ChaosStore::new(self, config)
    }
}

/// Unit of work handed out by [`ChaosStore`].
#[derive(Debug)]
pub struct ChaosUnit<U> {
    unit: U,
    injector: Arc<Injector>,
}

impl<U> UnitOfWork for ChaosUnit<U>
where
    U: UnitOfWork,
{
    async fn commit(self) -> Result<(), StorageError> {
        // dropping the inner unit discards it
        self.injector.check(Operation::Commit)?;
        self.unit.commit().await
    }

    async fn rollback(self) -> Result<(), StorageError> {
        if let Err(error) = self.injector.check(Operation::Rollback) {
            self.unit.commit().await?;
            return Err(error);
        }
        self.unit.rollback().await
    }
}

impl<U> InventoryLedger for ChaosUnit<U>
where
    U: UnitOfWork,
{
    async fn get_stock(&mut self, vaccine: &VaccineName) -> Result<DoseCount, LedgerError> {
        self.injector.check(Operation::GetStock)?;
        self.unit.get_stock(vaccine).await
    }

    async fn list_stock(&mut self) -> Result<Vec<Vaccine>, LedgerError> {
        self.injector.check(Operation::GetStock)?;
        self.unit.list_stock().await
    }

    async fn add_stock(
        &mut self,
        vaccine: &VaccineName,
        delta: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        self.injector.check(Operation::AddStock)?;
        self.unit.add_stock(vaccine, delta).await
    }

    async fn decrement_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        self.injector.check(Operation::DecrementStock)?;
        self.unit.decrement_stock(vaccine, amount).await
    }

    async fn increment_stock(
        &mut self,
        vaccine: &VaccineName,
        amount: DoseDelta,
    ) -> Result<DoseCount, LedgerError> {
        self.injector.check(Operation::IncrementStock)?;
        self.unit.increment_stock(vaccine, amount).await
    }
}

impl<U> AvailabilityRegistry for ChaosUnit<U>
where
    U: UnitOfWork,
{
    async fn offer(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        self.injector.check(Operation::OfferSlot)?;
        self.unit.offer(caregiver, date).await
    }

    async fn find_earliest(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Option<CaregiverId>, LedgerError> {
        self.injector.check(Operation::FindEarliestSlot)?;
        self.unit.find_earliest(date).await
    }

    async fn remove(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        self.injector.check(Operation::RemoveSlot)?;
        self.unit.remove(caregiver, date).await
    }

    async fn restore(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<(), LedgerError> {
        self.injector.check(Operation::RestoreSlot)?;
        self.unit.restore(caregiver, date).await
    }

    async fn is_offered(
        &mut self,
        caregiver: &CaregiverId,
        date: AppointmentDate,
    ) -> Result<bool, LedgerError> {
        self.injector.check(Operation::ReadSlots)?;
        self.unit.is_offered(caregiver, date).await
    }

    async fn list_for_date(
        &mut self,
        date: AppointmentDate,
    ) -> Result<Vec<CaregiverId>, LedgerError> {
        self.injector.check(Operation::ReadSlots)?;
        self.unit.list_for_date(date).await
    }
}

impl<U> AppointmentLedger for ChaosUnit<U>
where
    U: UnitOfWork,
{
    async fn next_id(&mut self) -> Result<AppointmentId, LedgerError> {
        self.injector.check(Operation::NextAppointmentId)?;
        self.unit.next_id().await
    }

    async fn insert(&mut self, appointment: &Appointment) -> Result<(), LedgerError> {
        self.injector.check(Operation::InsertAppointment)?;
        self.unit.insert(appointment).await
    }

    async fn find(&mut self, id: AppointmentId) -> Result<Appointment, LedgerError> {
        self.injector.check(Operation::ReadAppointments)?;
        self.unit.find(id).await
    }

    async fn delete(&mut self, id: AppointmentId) -> Result<(), LedgerError> {
        self.injector.check(Operation::DeleteAppointment)?;
        self.unit.delete(id).await
    }

    async fn list_for_patient(
        &mut self,
        patient: &PatientId,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.injector.check(Operation::ReadAppointments)?;
        self.unit.list_for_patient(patient).await
    }

    async fn list_for_caregiver(
        &mut self,
        caregiver: &CaregiverId,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.injector.check(Operation::ReadAppointments)?;
        self.unit.list_for_caregiver(caregiver).await
    }
}
