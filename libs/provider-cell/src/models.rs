use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareProvider {
    pub staff_id: Uuid,
    pub display_name: String,
    pub specialty_group: String,
    pub active: bool,
    #[serde(default)]
    pub weekly_shifts: Vec<ShiftWindow>,
}

impl CareProvider {
    pub fn new(staff_id: Uuid, display_name: &str, specialty_group: &str) -> Self {
        Self {
            staff_id,
            display_name: display_name.to_string(),
            specialty_group: specialty_group.to_lowercase(),
            active: true,
            weekly_shifts: Vec::new(),
        }
    }

    pub fn with_shift(mut self, shift: ShiftWindow) -> Self {
        self.weekly_shifts.push(shift);
        self
    }

    pub fn in_group(&self, specialty_group: &str) -> bool {
        self.specialty_group.eq_ignore_ascii_case(specialty_group.trim())
    }

    /// True when any weekly shift covers the given date and time of day.
    pub fn on_shift(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.weekly_shifts.iter().any(|shift| shift.covers(date.weekday(), time))
    }
}

/// Recurring weekly shift, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftWindow {
    pub fn covers(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.weekday == weekday && time >= self.start && time < self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Provider directory unavailable: {0}")]
    Backend(String),
}
