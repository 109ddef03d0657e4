// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentStatus, Priority};
use crate::store::{AppointmentStore, Revision};

/// Everything about a new appointment except the slot it will occupy.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub requester_id: Uuid,
    pub assigned_staff_id: Option<Uuid>,
    pub priority: Priority,
    pub health_issue_category: String,
    pub symptoms: String,
}

impl ReservationDraft {
    pub fn into_appointment(self, date: NaiveDate, time: NaiveTime) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            requester_id: self.requester_id,
            assigned_staff_id: self.assigned_staff_id,
            status: AppointmentStatus::Pending,
            priority: self.priority,
            health_issue_category: self.health_issue_category,
            symptoms: self.symptoms,
            requested_date: date,
            requested_time: time,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Atomic slot reservation. A slot that looked free can still lose a race here;
/// the loser gets `SchedulingError::Conflict` and nothing is written.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, draft), fields(requester_id = %draft.requester_id))]
    pub async fn try_reserve(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        draft: ReservationDraft,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = draft.into_appointment(date, time);

        match self.store.try_reserve(appointment).await {
            Ok(booked) => {
                info!("Reserved {} {} for appointment {}", date, time.format("%H:%M"), booked.id);
                Ok(booked)
            }
            Err(e) => {
                let err = SchedulingError::from(e);
                if matches!(err, SchedulingError::Conflict(_)) {
                    warn!("Reservation conflict for {} {}", date, time.format("%H:%M"));
                }
                Err(err)
            }
        }
    }

    /// Writes `updated` if the stored row is still at revision `expected`,
    /// so a write computed from a stale read never overwrites a newer one.
    /// Moving a live appointment re-runs the slot check atomically.
    pub async fn commit(
        &self,
        mut updated: Appointment,
        expected: Revision,
    ) -> Result<Appointment, SchedulingError> {
        updated.updated_at = Utc::now();
        let id = updated.id;

        self.store.update(updated, expected).await.map_err(|e| {
            let err = SchedulingError::from(e);
            if matches!(err, SchedulingError::Conflict(_)) {
                warn!("Write conflict on appointment {}: {}", id, err);
            }
            err
        })
    }
}
