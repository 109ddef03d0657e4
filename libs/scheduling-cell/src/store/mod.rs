// libs/scheduling-cell/src/store/mod.rs
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, BlackoutDate};

pub use memory::InMemorySchedulingStore;
pub use supabase::SupabaseSchedulingStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The target date is blacked out.
    #[error("{0}")]
    Closed(String),

    #[error("{0}")]
    Backend(String),
}

/// The stored row a write was computed from. A compare-and-swap write only
/// lands while the row still carries both values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub status: AppointmentStatus,
    pub updated_at: DateTime<Utc>,
}

impl Revision {
    pub fn of(appointment: &Appointment) -> Self {
        Self {
            status: appointment.status,
            updated_at: appointment.updated_at,
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status == appointment.status && self.updated_at == appointment.updated_at
    }
}

/// Appointment table. Every write that can take a slot is a single atomic step.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Inserts `appointment` unless a live appointment already holds its `(date, time)`.
    async fn try_reserve(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Replaces the stored row only while it is still at revision `expected`.
    /// A live replacement that moves to another slot is re-checked for occupancy.
    async fn update(&self, appointment: Appointment, expected: Revision) -> Result<Appointment, StoreError>;

    async fn delete(&self, id: Uuid, expected: AppointmentStatus) -> Result<Appointment, StoreError>;

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn live_on_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError>;

    async fn count_live_for_staff(&self, staff_id: Uuid) -> Result<usize, StoreError>;
}

/// Blackout dates, keyed by date.
#[async_trait]
pub trait BlackoutStore: Send + Sync {
    /// Upserts the blackout and cancels every live appointment on that date,
    /// returning the appointments as cancelled.
    async fn add_blackout(&self, blackout: BlackoutDate) -> Result<Vec<Appointment>, StoreError>;

    async fn get_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError>;

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, StoreError>;

    async fn remove_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError>;
}

pub(crate) fn slot_taken(appointment: &Appointment) -> StoreError {
    StoreError::Conflict(format!(
        "Slot {} {} is already booked",
        appointment.requested_date,
        appointment.requested_time.format("%H:%M")
    ))
}

pub(crate) fn stale_write(id: Uuid, current: &Appointment) -> StoreError {
    StoreError::Conflict(format!(
        "Appointment {} changed concurrently (now {} at {} {})",
        id,
        current.status,
        current.requested_date,
        current.requested_time.format("%H:%M")
    ))
}

pub(crate) fn date_closed(date: NaiveDate) -> StoreError {
    StoreError::Closed(format!("{} is a blackout date", date))
}
