use std::collections::{BTreeMap, BTreeSet};

use vaxbook::{Appointment, AppointmentDate, AppointmentId, CaregiverId, DoseCount, Slot, VaccineName};

/// Contents of all three ledgers plus the identifier high-water mark.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) vaccines: BTreeMap<VaccineName, DoseCount>,
    // caregivers per date; a set's first element is the tie-break winner
    pub(crate) slots: BTreeMap<AppointmentDate, BTreeSet<CaregiverId>>,
    pub(crate) appointments: BTreeMap<AppointmentId, Appointment>,
    pub(crate) high_water: Option<AppointmentId>,
}

impl LedgerState {
    pub(crate) fn insert_slot(&mut self, caregiver: CaregiverId, date: AppointmentDate) -> bool {
        self.slots.entry(date).or_default().insert(caregiver)
    }

    pub(crate) fn remove_slot(&mut self, caregiver: &CaregiverId, date: AppointmentDate) -> bool {
        let Some(caregivers) = self.slots.get_mut(&date) else {
            return false;
        };
        let removed = caregivers.remove(caregiver);
        if caregivers.is_empty() {
            self.slots.remove(&date);
        }
        removed
    }

    pub(crate) fn has_slot(&self, caregiver: &CaregiverId, date: AppointmentDate) -> bool {
        self.slots
            .get(&date)
            .is_some_and(|caregivers| caregivers.contains(caregiver))
    }

    pub(crate) fn is_booked(&self, caregiver: &CaregiverId, date: AppointmentDate) -> bool {
        self.appointments
            .values()
            .any(|appointment| appointment.caregiver == *caregiver && appointment.date == date)
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            vaccines: self.vaccines.clone(),
            slots: self
                .slots
                .iter()
                .flat_map(|(date, caregivers)| {
                    caregivers
                        .iter()
                        .map(|caregiver| Slot::new(caregiver.clone(), *date))
                })
                .collect(),
            appointments: self.appointments.values().cloned().collect(),
        }
    }

    /// Reverses one journaled mutation. `Err` names the entry that no longer
    /// matches the state.
    pub(crate) fn revert(&mut self, entry: Undo) -> Result<(), String> {
        let applied = match &entry {
            Undo::RemoveVaccine(name) => self.vaccines.remove(name).is_some(),
            Undo::SetStock(name, doses) => match self.vaccines.get_mut(name) {
                Some(current) => {
                    *current = *doses;
                    true
                }
                None => false,
            },
            Undo::RemoveSlot(caregiver, date) => self.remove_slot(caregiver, *date),
            Undo::InsertSlot(caregiver, date) => self.insert_slot(caregiver.clone(), *date),
            Undo::RemoveAppointment(id) => self.appointments.remove(id).is_some(),
            Undo::InsertAppointment(appointment) => self
                .appointments
                .insert(appointment.id, appointment.clone())
                .is_none(),
            Undo::SetHighWater(mark) => {
                self.high_water = *mark;
                true
            }
        };
        if applied {
            Ok(())
        } else {
            Err(format!("cannot undo {entry:?}: ledger state changed underneath"))
        }
    }
}

/// Inverse of a mutation made through a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Undo {
    RemoveVaccine(VaccineName),
    SetStock(VaccineName, DoseCount),
    RemoveSlot(CaregiverId, AppointmentDate),
    InsertSlot(CaregiverId, AppointmentDate),
    RemoveAppointment(AppointmentId),
    InsertAppointment(Appointment),
    SetHighWater(Option<AppointmentId>),
}

/// Point-in-time copy of the ledger contents, for assertions and diagnostics.
///
/// The identifier high-water mark is left out so that a reservation followed
/// by its cancellation compares equal to the state before both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Stock per vaccine.
    pub vaccines: BTreeMap<VaccineName, DoseCount>,
    /// Offered slots in (caregiver, date) order.
    pub slots: BTreeSet<Slot>,
    /// Appointments in ascending identifier order.
    pub appointments: Vec<Appointment>,
}

impl LedgerSnapshot {
    /// Stock of `vaccine`, if it is in the inventory.
    pub fn stock(&self, vaccine: &VaccineName) -> Option<DoseCount> {
        self.vaccines.get(vaccine).copied()
    }

    /// Whether the slot is offered.
    pub fn is_offered(&self, caregiver: &CaregiverId, date: AppointmentDate) -> bool {
        self.slots.contains(&Slot::new(caregiver.clone(), date))
    }
}
