// libs/scheduling-cell/src/services/events.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Appointment;

/// What a notification or email collaborator needs to render a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentEventPayload {
    pub appointment_id: Uuid,
    pub requester_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub symptoms: String,
}

impl From<&Appointment> for AppointmentEventPayload {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            requester_id: appointment.requester_id,
            staff_id: appointment.assigned_staff_id,
            date: appointment.requested_date,
            time: appointment.requested_time,
            symptoms: appointment.symptoms.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulingEvent {
    AppointmentCreated {
        #[serde(flatten)]
        payload: AppointmentEventPayload,
    },
    SymptomsUpdated {
        #[serde(flatten)]
        payload: AppointmentEventPayload,
    },
    AppointmentApproved {
        #[serde(flatten)]
        payload: AppointmentEventPayload,
    },
    AppointmentRejected {
        #[serde(flatten)]
        payload: AppointmentEventPayload,
        reason: Option<String>,
    },
    AppointmentCancelled {
        #[serde(flatten)]
        payload: AppointmentEventPayload,
        reason: Option<String>,
    },
}

impl SchedulingEvent {
    pub fn created(appointment: &Appointment) -> Self {
        Self::AppointmentCreated { payload: appointment.into() }
    }

    pub fn symptoms_updated(appointment: &Appointment) -> Self {
        Self::SymptomsUpdated { payload: appointment.into() }
    }

    pub fn approved(appointment: &Appointment) -> Self {
        Self::AppointmentApproved { payload: appointment.into() }
    }

    pub fn rejected(appointment: &Appointment, reason: Option<String>) -> Self {
        Self::AppointmentRejected { payload: appointment.into(), reason }
    }

    pub fn cancelled(appointment: &Appointment, reason: Option<String>) -> Self {
        Self::AppointmentCancelled { payload: appointment.into(), reason }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AppointmentCreated { .. } => "appointment_created",
            Self::SymptomsUpdated { .. } => "symptoms_updated",
            Self::AppointmentApproved { .. } => "appointment_approved",
            Self::AppointmentRejected { .. } => "appointment_rejected",
            Self::AppointmentCancelled { .. } => "appointment_cancelled",
        }
    }

    pub fn payload(&self) -> &AppointmentEventPayload {
        match self {
            Self::AppointmentCreated { payload }
            | Self::SymptomsUpdated { payload }
            | Self::AppointmentApproved { payload }
            | Self::AppointmentRejected { payload, .. }
            | Self::AppointmentCancelled { payload, .. } => payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event delivery failed: {0}")]
    Delivery(String),
}

/// Outbound seam to the notification and email subsystems.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: SchedulingEvent) -> Result<(), EventError>;
}

/// Publishes after the write has committed; failures are logged and dropped.
pub async fn publish_quietly(sink: &dyn EventSink, event: SchedulingEvent) {
    let name = event.name();
    let appointment_id = event.payload().appointment_id;

    if let Err(e) = sink.publish(event).await {
        warn!("Dropping {} event for appointment {}: {}", name, appointment_id, e);
    }
}

/// Sink that only logs. Used when no collaborator is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: SchedulingEvent) -> Result<(), EventError> {
        let payload = event.payload();
        info!("{} appointment={} requester={} staff={:?} at {} {}",
              event.name(), payload.appointment_id, payload.requester_id,
              payload.staff_id, payload.date, payload.time.format("%H:%M"));
        Ok(())
    }
}

/// Hands events to an in-process consumer without blocking the booking path.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<SchedulingEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SchedulingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish(&self, event: SchedulingEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::Delivery("event receiver dropped".to_string()))
    }
}
