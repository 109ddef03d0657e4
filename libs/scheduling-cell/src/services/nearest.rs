// libs/scheduling-cell/src/services/nearest.rs
use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::CalendarSlot;
use crate::services::availability::AvailabilityService;

/// Searches for the closest bookable slot on a single, explicit date.
#[derive(Clone)]
pub struct NearestSlotResolver {
    availability: AvailabilityService,
}

impl NearestSlotResolver {
    pub fn new(availability: AvailabilityService) -> Self {
        Self { availability }
    }

    pub async fn find_nearest(
        &self,
        date: NaiveDate,
        requested_time: NaiveTime,
    ) -> Result<CalendarSlot, SchedulingError> {
        self.find_nearest_excluding(date, requested_time, None).await
    }

    pub async fn find_nearest_excluding(
        &self,
        date: NaiveDate,
        requested_time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<CalendarSlot, SchedulingError> {
        let anchor = self.availability.calendar().grid().floor_to_grid(requested_time);
        let available = self.availability.available_slots_excluding(date, exclude).await?;

        let slot = nearest_slot(&available, anchor).ok_or_else(|| {
            SchedulingError::NotFound(format!("No available slot on {}", date))
        })?;

        debug!("Nearest slot to {} on {} (anchor {}) is {}",
               requested_time.format("%H:%M"), date, anchor.format("%H:%M"),
               slot.start_time.format("%H:%M"));
        Ok(slot)
    }
}

/// First slot at or after `anchor`; failing that, the latest slot before it.
/// `available` must be ascending by start time.
pub fn nearest_slot(available: &[CalendarSlot], anchor: NaiveTime) -> Option<CalendarSlot> {
    available
        .iter()
        .find(|slot| slot.start_time >= anchor)
        .or_else(|| available.iter().rev().find(|slot| slot.start_time < anchor))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn slots(starts: &[(u32, u32)]) -> Vec<CalendarSlot> {
        starts
            .iter()
            .map(|&(h, m)| CalendarSlot {
                day_of_week: Weekday::Mon,
                start_time: t(h, m),
                end_time: t(h, m) + chrono::Duration::minutes(20),
            })
            .collect()
    }

    #[test]
    fn test_anchor_itself_is_returned_when_free() {
        let available = slots(&[(9, 0), (9, 40), (10, 0)]);
        assert_eq!(nearest_slot(&available, t(9, 40)).unwrap().start_time, t(9, 40));
    }

    #[test]
    fn test_forward_scan_wins_over_closer_earlier_slot() {
        // 09:20 is only 20 minutes away but earlier; forward search comes first.
        let available = slots(&[(9, 20), (11, 0)]);
        assert_eq!(nearest_slot(&available, t(9, 40)).unwrap().start_time, t(11, 0));
    }

    #[test]
    fn test_backward_scan_returns_latest_earlier_slot() {
        let available = slots(&[(9, 0), (9, 20), (13, 0)]);
        assert_eq!(nearest_slot(&available, t(15, 40)).unwrap().start_time, t(13, 0));
    }

    #[test]
    fn test_empty_availability_yields_none() {
        assert!(nearest_slot(&[], t(9, 0)).is_none());
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let available = slots(&[(9, 0), (10, 20), (14, 40)]);
        let first = nearest_slot(&available, t(10, 0));
        for _ in 0..10 {
            assert_eq!(nearest_slot(&available, t(10, 0)), first);
        }
    }
}
