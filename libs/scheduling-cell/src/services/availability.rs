// libs/scheduling-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{Appointment, CalendarSlot};
use crate::services::calendar::CalendarService;
use crate::store::AppointmentStore;

/// Advisory view of free slots. Final say on a slot belongs to the store's reservation.
#[derive(Clone)]
pub struct AvailabilityService {
    calendar: CalendarService,
    store: Arc<dyn AppointmentStore>,
}

impl AvailabilityService {
    pub fn new(calendar: CalendarService, store: Arc<dyn AppointmentStore>) -> Self {
        Self { calendar, store }
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    /// Schedulable slots on `date` not held by a live appointment, ascending by start time.
    pub async fn available_slots(&self, date: NaiveDate) -> Result<Vec<CalendarSlot>, SchedulingError> {
        self.available_slots_excluding(date, None).await
    }

    /// As [`available_slots`](Self::available_slots), but treats the slot held by
    /// `exclude` as free (an appointment may keep or move within its own slot).
    pub async fn available_slots_excluding(
        &self,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<CalendarSlot>, SchedulingError> {
        let slots = self.calendar.slots_for_day(date).await?;
        if slots.is_empty() {
            return Ok(slots);
        }

        let live = self.store.live_on_date(date).await?;
        let occupied = occupied_times(&live, exclude);
        let available = subtract_occupied(slots, &occupied);

        debug!("{} has {} available slots ({} occupied)", date, available.len(), occupied.len());
        Ok(available)
    }
}

fn occupied_times(live: &[Appointment], exclude: Option<Uuid>) -> HashSet<NaiveTime> {
    live.iter()
        .filter(|a| a.is_live() && Some(a.id) != exclude)
        .map(|a| a.requested_time)
        .collect()
}

/// Removes every slot whose start time is occupied, keeping the input order.
pub fn subtract_occupied(slots: Vec<CalendarSlot>, occupied: &HashSet<NaiveTime>) -> Vec<CalendarSlot> {
    slots
        .into_iter()
        .filter(|slot| !occupied.contains(&slot.start_time))
        .collect()
}
