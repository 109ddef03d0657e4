// libs/scheduling-cell/src/store/supabase.rs
//
// PostgREST-backed tables. Slot exclusivity is enforced by the database:
//
//   create unique index appointments_live_slot_key
//     on appointments (requested_date, requested_time)
//     where status in ('pending', 'approved', 'scheduled');
//
// A violated index comes back as 409 / 23505 and is reported as a conflict.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, BlackoutDate};
use crate::store::{
    date_closed, slot_taken, stale_write, AppointmentStore, BlackoutStore, Revision, StoreError,
};

const APPOINTMENTS: &str = "/rest/v1/appointments";
const BLACKOUTS: &str = "/rest/v1/blackout_dates";

pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn from_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn live_filter() -> String {
        let statuses: Vec<&str> = AppointmentStatus::LIVE.iter().map(|s| s.as_str()).collect();
        format!("status=in.({})", statuses.join(","))
    }

    async fn fetch_appointments(&self, path: &str) -> Result<Vec<Appointment>, StoreError> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, path, None)
            .await
            .map_err(backend)?;
        parse_rows(rows)
    }

    /// Write returning the affected rows undecoded, so callers can inspect conflicts first.
    async fn write_rows(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Vec<Value>, SupabaseError> {
        self.supabase
            .request_with_headers(method, path, body, Some(SupabaseClient::representation_headers()))
            .await
    }

    /// Explains why a compare-and-swap write matched no rows.
    async fn missed_write(&self, id: Uuid) -> StoreError {
        match self.get(id).await {
            Ok(Some(current)) => stale_write(id, &current),
            Ok(None) => StoreError::NotFound(format!("Appointment {} not found", id)),
            Err(e) => e,
        }
    }
}

/// PostgREST timestamp literal with a `Z` suffix; a bare `+` in a query string decodes to a space.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn backend(err: SupabaseError) -> StoreError {
    match err {
        SupabaseError::Conflict(msg) => StoreError::Conflict(msg),
        SupabaseError::NotFound(msg) => StoreError::NotFound(msg),
        other => StoreError::Backend(other.to_string()),
    }
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| StoreError::Backend(format!("Failed to parse row: {}", e)))
        })
        .collect()
}

fn to_row<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(format!("Failed to encode row: {}", e)))
}

#[async_trait]
impl AppointmentStore for SupabaseSchedulingStore {
    async fn try_reserve(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        debug!("Reserving {} {} for appointment {}",
               appointment.requested_date, appointment.requested_time, appointment.id);

        // Advisory only; the unique index decides races on the slot itself.
        if self.get_blackout(appointment.requested_date).await?.is_some() {
            return Err(date_closed(appointment.requested_date));
        }

        let body = to_row(&appointment)?;
        match self.write_rows(Method::POST, APPOINTMENTS, Some(body)).await {
            Ok(rows) => parse_rows::<Appointment>(rows)?
                .into_iter()
                .next()
                .ok_or_else(|| StoreError::Backend("Failed to create appointment".to_string())),
            Err(SupabaseError::Conflict(detail)) => {
                warn!("Reservation lost for {} {}: {}",
                      appointment.requested_date, appointment.requested_time, detail);
                Err(slot_taken(&appointment))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        Ok(self.fetch_appointments(&path).await?.into_iter().next())
    }

    async fn update(&self, appointment: Appointment, expected: Revision) -> Result<Appointment, StoreError> {
        let path = format!(
            "{}?id=eq.{}&status=eq.{}&updated_at=eq.{}",
            APPOINTMENTS,
            appointment.id,
            expected.status,
            timestamp(&expected.updated_at)
        );
        let body = json!({
            "assigned_staff_id": appointment.assigned_staff_id,
            "status": appointment.status,
            "priority": appointment.priority,
            "symptoms": appointment.symptoms,
            "requested_date": appointment.requested_date,
            "requested_time": appointment.requested_time,
            "rejection_reason": appointment.rejection_reason,
            "updated_at": timestamp(&appointment.updated_at),
        });

        match self.write_rows(Method::PATCH, &path, Some(body)).await {
            Ok(rows) => match parse_rows::<Appointment>(rows)?.into_iter().next() {
                Some(updated) => Ok(updated),
                None => Err(self.missed_write(appointment.id).await),
            },
            Err(SupabaseError::Conflict(_)) => Err(slot_taken(&appointment)),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, id: Uuid, expected: AppointmentStatus) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}&status=eq.{}", APPOINTMENTS, id, expected);
        let rows = self.write_rows(Method::DELETE, &path, None).await.map_err(backend)?;
        match parse_rows::<Appointment>(rows)?.into_iter().next() {
            Some(deleted) => Ok(deleted),
            None => Err(self.missed_write(id).await),
        }
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = Vec::new();

        if let Some(requester_id) = filter.requester_id {
            query_parts.push(format!("requester_id=eq.{}", requester_id));
        }
        if let Some(staff_id) = filter.assigned_staff_id {
            query_parts.push(format!("assigned_staff_id=eq.{}", staff_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = filter.date {
            query_parts.push(format!("requested_date=eq.{}", date));
        }
        query_parts.push("order=requested_date.asc,requested_time.asc,created_at.asc".to_string());

        let path = format!("{}?{}", APPOINTMENTS, query_parts.join("&"));
        self.fetch_appointments(&path).await
    }

    async fn live_on_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?requested_date=eq.{}&{}&order=requested_time.asc",
            APPOINTMENTS, date, Self::live_filter()
        );
        self.fetch_appointments(&path).await
    }

    async fn count_live_for_staff(&self, staff_id: Uuid) -> Result<usize, StoreError> {
        let path = format!(
            "{}?assigned_staff_id=eq.{}&{}&select=id",
            APPOINTMENTS, staff_id, Self::live_filter()
        );
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;
        Ok(rows.len())
    }
}

#[async_trait]
impl BlackoutStore for SupabaseSchedulingStore {
    async fn add_blackout(&self, blackout: BlackoutDate) -> Result<Vec<Appointment>, StoreError> {
        debug!("Adding blackout date {}", blackout.date);

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        let _: Vec<Value> = self.supabase
            .request_with_headers(Method::POST, BLACKOUTS, Some(to_row(&blackout)?), Some(headers))
            .await
            .map_err(backend)?;

        let path = format!(
            "{}?requested_date=eq.{}&{}",
            APPOINTMENTS, blackout.date, Self::live_filter()
        );
        let body = json!({
            "status": AppointmentStatus::Cancelled,
            "updated_at": timestamp(&Utc::now()),
        });
        let rows = self.write_rows(Method::PATCH, &path, Some(body)).await.map_err(backend)?;
        parse_rows(rows)
    }

    async fn get_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError> {
        let path = format!("{}?date=eq.{}", BLACKOUTS, date);
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;
        Ok(parse_rows(rows)?.into_iter().next())
    }

    async fn list_blackouts(&self) -> Result<Vec<BlackoutDate>, StoreError> {
        let path = format!("{}?order=date.asc", BLACKOUTS);
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;
        parse_rows(rows)
    }

    async fn remove_blackout(&self, date: NaiveDate) -> Result<Option<BlackoutDate>, StoreError> {
        let path = format!("{}?date=eq.{}", BLACKOUTS, date);
        let rows: Vec<Value> = self.supabase
            .request_with_headers(Method::DELETE, &path, None, Some(SupabaseClient::representation_headers()))
            .await
            .map_err(backend)?;
        Ok(parse_rows(rows)?.into_iter().next())
    }
}
