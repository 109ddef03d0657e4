use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub bind_addr: String,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - scheduling will run on in-memory stores");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }
}

/// A half-open `[start, end)` window of bookable time within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BusinessWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Calendar grid and booking policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub slot_minutes: u32,
    pub windows: Vec<BusinessWindow>,
    pub categories: Vec<String>,
    pub enforce_shift_schedule: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 20,
            windows: vec![
                BusinessWindow::new(hm(9, 0), hm(12, 0)),
                BusinessWindow::new(hm(13, 0), hm(16, 0)),
            ],
            categories: vec!["physical".to_string(), "mental".to_string()],
            enforce_shift_schedule: false,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let slot_minutes = match env::var("SCHEDULING_SLOT_MINUTES") {
            Ok(raw) => match u32::from_str(raw.trim()) {
                Ok(minutes) if minutes > 0 && minutes <= 240 => minutes,
                _ => {
                    warn!("SCHEDULING_SLOT_MINUTES={} is invalid, using {}", raw, defaults.slot_minutes);
                    defaults.slot_minutes
                }
            },
            Err(_) => defaults.slot_minutes,
        };

        let morning = window_from_env(
            "SCHEDULING_MORNING_START",
            "SCHEDULING_MORNING_END",
            defaults.windows[0],
        );
        let afternoon = window_from_env(
            "SCHEDULING_AFTERNOON_START",
            "SCHEDULING_AFTERNOON_END",
            defaults.windows[1],
        );

        let categories = env::var("SCHEDULING_CATEGORIES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.categories);

        let enforce_shift_schedule = env::var("SCHEDULING_ENFORCE_SHIFTS")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            slot_minutes,
            windows: vec![morning, afternoon],
            categories,
            enforce_shift_schedule,
        }
    }

    pub fn is_allowed_category(&self, category: &str) -> bool {
        let category = category.trim().to_lowercase();
        self.categories.iter().any(|c| *c == category)
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn window_from_env(start_key: &str, end_key: &str, fallback: BusinessWindow) -> BusinessWindow {
    let start = time_from_env(start_key, fallback.start);
    let end = time_from_env(end_key, fallback.end);

    if start >= end {
        warn!("{}/{} describe an empty window, using default", start_key, end_key);
        return fallback;
    }

    BusinessWindow::new(start, end)
}

fn time_from_env(key: &str, fallback: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{}={} is not HH:MM, using {}", key, raw, fallback.format("%H:%M"));
            fallback
        }),
        Err(_) => fallback,
    }
}
