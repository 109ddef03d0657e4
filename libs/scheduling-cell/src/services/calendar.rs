// libs/scheduling-cell/src/services/calendar.rs
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use tracing::debug;

use shared_config::{BusinessWindow, SchedulingConfig};

use crate::error::SchedulingError;
use crate::models::CalendarSlot;
use crate::store::BlackoutStore;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Weekday grid of fixed-width slots. Slot boundaries are multiples of the
/// slot width counted from midnight, so a window that starts off-grid begins
/// at its next boundary.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    slot_minutes: u32,
    windows: Vec<BusinessWindow>,
}

impl SlotGrid {
    pub fn new(slot_minutes: u32, windows: Vec<BusinessWindow>) -> Self {
        let mut windows = windows;
        windows.sort_by_key(|w| w.start);
        Self {
            slot_minutes: slot_minutes.max(1),
            windows,
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(config.slot_minutes, config.windows.clone())
    }

    pub fn is_weekday(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Grid slots for the date's weekday, ignoring blackouts.
    pub fn slots_for_weekday(&self, date: NaiveDate) -> Vec<CalendarSlot> {
        if !Self::is_weekday(date) {
            return Vec::new();
        }

        let day_of_week = date.weekday();
        let mut slots = Vec::new();

        for window in &self.windows {
            let window_end = minutes_of(window.end);
            let mut start = self.ceil_minutes(minutes_of(window.start));

            while start + self.slot_minutes <= window_end {
                let end = start + self.slot_minutes;
                if let (Some(start_time), Some(end_time)) = (time_of(start), time_of(end)) {
                    slots.push(CalendarSlot { day_of_week, start_time, end_time });
                }
                start = end;
            }
        }

        slots.sort_by_key(|s| s.start_time);
        slots.dedup_by_key(|s| s.start_time);
        slots
    }

    /// Rounds down to the previous grid boundary.
    pub fn floor_to_grid(&self, time: NaiveTime) -> NaiveTime {
        let minutes = minutes_of(time);
        time_of(minutes - minutes % self.slot_minutes).unwrap_or(NaiveTime::MIN)
    }

    /// The grid slot starting exactly at `time` on `date`, if any.
    pub fn slot_at(&self, date: NaiveDate, time: NaiveTime) -> Option<CalendarSlot> {
        self.slots_for_weekday(date)
            .into_iter()
            .find(|slot| slot.start_time == time)
    }

    fn ceil_minutes(&self, minutes: u32) -> u32 {
        let rem = minutes % self.slot_minutes;
        if rem == 0 { minutes } else { minutes + (self.slot_minutes - rem) }
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Schedulable days and slots: the weekday grid minus blackout dates.
#[derive(Clone)]
pub struct CalendarService {
    grid: SlotGrid,
    blackouts: Arc<dyn BlackoutStore>,
}

impl CalendarService {
    pub fn new(grid: SlotGrid, blackouts: Arc<dyn BlackoutStore>) -> Self {
        Self { grid, blackouts }
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub async fn is_bookable_day(&self, date: NaiveDate) -> Result<bool, SchedulingError> {
        if !SlotGrid::is_weekday(date) {
            return Ok(false);
        }
        Ok(self.blackouts.get_blackout(date).await?.is_none())
    }

    pub async fn slots_for_day(&self, date: NaiveDate) -> Result<Vec<CalendarSlot>, SchedulingError> {
        if !self.is_bookable_day(date).await? {
            debug!("{} is not bookable", date);
            return Ok(Vec::new());
        }
        Ok(self.grid.slots_for_weekday(date))
    }
}
