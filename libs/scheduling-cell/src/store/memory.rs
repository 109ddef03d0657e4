// libs/scheduling-cell/src/store/memory.rs
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, BlackoutDate};
use crate::store::{
    date_closed, slot_taken, stale_write, AppointmentStore, BlackoutStore, Revision, StoreError,
};

#[derive(Default)]
struct StoreState {
    appointments: HashMap<Uuid, Appointment>,
    blackouts: BTreeMap<NaiveDate, BlackoutDate>,
}

impl StoreState {
    fn slot_holder(&self, candidate: &Appointment) -> Option<&Appointment> {
        self.appointments.values().find(|existing| {
            existing.id != candidate.id
                && existing.occupies(candidate.requested_date, candidate.requested_time)
        })
    }

    fn find(&self, id: Uuid) -> Result<&Appointment, StoreError> {
        self.appointments
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Appointment {} not found", id)))
    }

    fn check_revision(&self, id: Uuid, expected: &Revision) -> Result<&Appointment, StoreError> {
        let current = self.find(id)?;
        if !expected.matches(current) {
            return Err(stale_write(id, current));
        }
        Ok(current)
    }

    fn check_status(&self, id: Uuid, expected: AppointmentStatus) -> Result<&Appointment, StoreError> {
        let current = self.find(id)?;
        if current.status != expected {
            return Err(stale_write(id, current));
        }
        Ok(current)
    }
}

/// Appointment and blackout tables behind a single lock, so every check-then-write
/// is atomic with respect to every other writer.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    state: Mutex<StoreState>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_for_listing(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        (a.requested_date, a.requested_time, a.created_at, a.id)
            .cmp(&(b.requested_date, b.requested_time, b.created_at, b.id))
    });
}

#[async_trait]
impl AppointmentStore for InMemorySchedulingStore {
    async fn try_reserve(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut state = self.state.lock().await;

        if state.blackouts.contains_key(&appointment.requested_date) {
            return Err(date_closed(appointment.requested_date));
        }
        if state.appointments.contains_key(&appointment.id) {
            return Err(StoreError::Conflict(format!("Appointment {} already exists", appointment.id)));
        }
        if appointment.is_live() && state.slot_holder(&appointment).is_some() {
            return Err(slot_taken(&appointment));
        }

        debug!("Reserved {} {} for appointment {}",
               appointment.requested_date, appointment.requested_time, appointment.id);
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.lock().await.appointments.get(&id).cloned())
    }

    async fn update(&self, appointment: Appointment, expected: Revision) -> Result<Appointment, StoreError> {
        let mut state = self.state.lock().await;
        let current = state.check_revision(appointment.id, &expected)?;

        let moved = current.requested_date != appointment.requested_date
            || current.requested_time != appointment.requested_time;

        if moved && appointment.is_live() {
            if state.blackouts.contains_key(&appointment.requested_date) {
                return Err(date_closed(appointment.requested_date));
            }
            if state.slot_holder(&appointment).is_some() {
                return Err(slot_taken(&appointment));
            }
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: Uuid, expected: AppointmentStatus) -> Result<Appointment, StoreError> {
        let mut state = self.state.lock().await;
        state.check_status(id, expected)?;
        state
            .appointments
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Appointment {} not found", id)))
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_for_listing(&mut found);
        Ok(found)
    }

    async fn live_on_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.is_live() && a.requested_date == date)
            .cloned()
            .collect();
        sort_for_listing(&mut found);
        Ok(found)
    }

    async fn count_live_for_staff(&self, staff_id: Uuid) -> Result<usize, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .appointments
            .values()
            .filter(|a| a.is_live() && a.is_assigned_to(staff_id))
            .count())
    }
}

#[async_trait]
impl BlackoutStore for InMemorySchedulingStore {
    async fn add_blackout(&self, blackout: BlackoutDate) -> Result<Vec<Appointment>, StoreError> {
        let mut state = self.state.lock().await;
        let date = blackout.date;
        state.blackouts.insert(date, blackout);

        let now = Utc::now();
        let mut cancelled = Vec::new();
        for appointment in state.appointments.values_mut() {
            if appointment.is_live() && appointment.requested_date == date {
                appointment.status = AppointmentStatus::Cancelled;
                appointment.updated_at = now;
                cancelled.push(appointment.clone());
            }
        }
        sort_for_listing(&mut cancelled);
        Ok(cancelled)
    }

    async fn get_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError> {
        Ok(self.state.lock().await.blackouts.get(&date).cloned())
    }

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, StoreError> {
        Ok(self.state.lock().await.blackouts.values().cloned().collect())
    }

    async fn remove_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError> {
        Ok(self.state.lock().await.blackouts.remove(&date))
    }
}
