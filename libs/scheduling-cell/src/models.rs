// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub assigned_staff_id: Option<Uuid>,
    pub status: AppointmentStatus,
    pub priority: Priority,
    pub health_issue_category: String,
    pub symptoms: String,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True while the appointment occupies its `(date, time)` slot.
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn occupies(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.is_live() && self.requested_date == date && self.requested_time == time
    }

    pub fn is_assigned_to(&self, staff_id: Uuid) -> bool {
        self.assigned_staff_id == Some(staff_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub const LIVE: [AppointmentStatus; 3] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Scheduled,
    ];

    pub fn is_live(&self) -> bool {
        Self::LIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown status '{}'; expected one of: {}",
                    s,
                    join_statuses(&Self::ALL)
                )
            })
    }
}

pub fn join_statuses(statuses: &[AppointmentStatus]) -> String {
    statuses.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

// ==============================================================================
// CALENDAR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CalendarSlot {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackoutDate {
    pub date: NaiveDate,
    pub reason: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Owner of the appointment; defaults to the caller when absent.
    pub requester_id: Option<Uuid>,
    pub symptoms: String,
    #[serde(default)]
    pub priority: Priority,
    pub health_issue_category: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub symptoms: Option<String>,
    pub priority: Option<Priority>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Raw target status, validated against the state machine.
    pub status: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn moves_slot(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }
}

/// Optional slot override a staff member may supply when approving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlackoutRequest {
    pub date: NaiveDate,
    pub reason: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackoutOutcome {
    pub blackout: BlackoutDate,
    pub cancelled_appointment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub requester_id: Option<Uuid>,
    pub assigned_staff_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.requester_id.map_or(true, |id| appointment.requester_id == id)
            && self.assigned_staff_id.map_or(true, |id| appointment.assigned_staff_id == Some(id))
            && self.status.map_or(true, |s| appointment.status == s)
            && self.date.map_or(true, |d| appointment.requested_date == d)
    }
}
