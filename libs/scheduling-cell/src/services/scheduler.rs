// libs/scheduling-cell/src/services/scheduler.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use provider_cell::ProviderDirectory;
use shared_config::SchedulingConfig;
use shared_models::auth::{Role, User};

use crate::error::SchedulingError;
use crate::models::{
    AddBlackoutRequest, Appointment, AppointmentFilter, AppointmentStatus,
    ApproveAppointmentRequest, BlackoutDate, BlackoutOutcome, CalendarSlot,
    CreateAppointmentRequest, RejectAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::assignment::StaffAssignmentService;
use crate::services::availability::AvailabilityService;
use crate::services::booking::{BookingService, ReservationDraft};
use crate::services::calendar::{CalendarService, SlotGrid};
use crate::services::events::{publish_quietly, EventSink, SchedulingEvent};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::nearest::NearestSlotResolver;
use crate::services::permissions::{authorize, Operation};
use crate::store::{AppointmentStore, BlackoutStore, InMemorySchedulingStore, Revision};

/// Entry point for every scheduling operation.
///
/// Each write runs as one store call; events go out only after it has
/// committed and a failed delivery never fails the operation.
#[derive(Clone)]
pub struct SchedulingService {
    config: SchedulingConfig,
    appointments: Arc<dyn AppointmentStore>,
    blackouts: Arc<dyn BlackoutStore>,
    directory: Arc<dyn ProviderDirectory>,
    events: Arc<dyn EventSink>,
    availability: AvailabilityService,
    nearest: NearestSlotResolver,
    booking: BookingService,
    assignment: StaffAssignmentService,
    lifecycle: AppointmentLifecycleService,
}

impl SchedulingService {
    pub fn new(
        config: SchedulingConfig,
        appointments: Arc<dyn AppointmentStore>,
        blackouts: Arc<dyn BlackoutStore>,
        directory: Arc<dyn ProviderDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let calendar = CalendarService::new(SlotGrid::from_config(&config), Arc::clone(&blackouts));
        let availability = AvailabilityService::new(calendar, Arc::clone(&appointments));
        let nearest = NearestSlotResolver::new(availability.clone());
        let booking = BookingService::new(Arc::clone(&appointments));
        let assignment = StaffAssignmentService::new(
            Arc::clone(&directory),
            Arc::clone(&appointments),
            config.enforce_shift_schedule,
        );

        Self {
            config,
            appointments,
            blackouts,
            directory,
            events,
            availability,
            nearest,
            booking,
            assignment,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Service backed by a fresh [`InMemorySchedulingStore`].
    pub fn in_memory(
        config: SchedulingConfig,
        directory: Arc<dyn ProviderDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let store = Arc::new(InMemorySchedulingStore::new());
        Self::new(config, store.clone(), store, directory, events)
    }

    pub async fn available_slots(&self, date: NaiveDate) -> Result<Vec<CalendarSlot>, SchedulingError> {
        self.availability.available_slots(date).await
    }

    // ==============================================================================
    // CREATE
    // ==============================================================================

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id))]
    pub async fn create_appointment(
        &self,
        actor: &User,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let requester_id = request.requester_id.unwrap_or(actor.id);
        authorize(actor, Operation::Book { requester_id }, None)?;

        // **Step 1: Validate input**
        let category = self.validate_category(&request.health_issue_category)?;
        let symptoms = validate_symptoms(&request.symptoms)?;
        let (date, time) = match (request.date, request.time) {
            (Some(date), Some(time)) => (date, time),
            _ => {
                return Err(SchedulingError::Validation(
                    "Both date and time are required".to_string(),
                ))
            }
        };

        // **Step 2: Resolve the slot**
        let slot_time = if actor.role.is_staff_or_admin() {
            authorize(actor, Operation::BookExplicitSlot, None)?;
            self.ensure_exact_slot(date, time).await?
        } else {
            self.nearest.find_nearest(date, time).await?.start_time
        };

        // **Step 3: Pick a provider**
        let assigned_staff_id = match request.staff_id {
            Some(staff_id) => Some(self.ensure_provider(staff_id).await?),
            None => self.auto_assign(&category, date, slot_time).await,
        };

        // **Step 4: Reserve atomically**
        let draft = ReservationDraft {
            requester_id,
            assigned_staff_id,
            priority: request.priority,
            health_issue_category: category,
            symptoms,
        };
        let appointment = self.booking.try_reserve(date, slot_time, draft).await?;

        info!("Created appointment {} for requester {} at {} {}",
              appointment.id, requester_id, date, slot_time.format("%H:%M"));
        publish_quietly(self.events.as_ref(), SchedulingEvent::created(&appointment)).await;

        Ok(appointment)
    }

    // ==============================================================================
    // UPDATE
    // ==============================================================================

    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id))]
    pub async fn update_appointment(
        &self,
        id: Uuid,
        actor: &User,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.load(id).await?;
        let mut updated = current.clone();

        let touches_details = patch.symptoms.is_some() || patch.priority.is_some();
        if !touches_details && !patch.moves_slot() && patch.status.is_none() {
            return Err(SchedulingError::Validation("No fields to update".to_string()));
        }

        if touches_details {
            authorize(actor, Operation::EditDetails, Some(&current))?;
            self.lifecycle.ensure_symptoms_editable(current.status)?;

            if let Some(symptoms) = &patch.symptoms {
                updated.symptoms = validate_symptoms(symptoms)?;
            }
            if let Some(priority) = patch.priority {
                updated.priority = priority;
            }
        }

        if patch.moves_slot() {
            authorize(actor, Operation::Reschedule, Some(&current))?;
            self.lifecycle.ensure_reschedulable(current.status)?;

            let date = patch.date.unwrap_or(current.requested_date);
            let time = patch.time.unwrap_or(current.requested_time);
            let slot_time = if actor.role.is_staff_or_admin() {
                self.ensure_exact_slot(date, time).await?
            } else {
                self.nearest
                    .find_nearest_excluding(date, time, Some(current.id))
                    .await?
                    .start_time
            };

            updated.requested_date = date;
            updated.requested_time = slot_time;
        }

        let target = match &patch.status {
            Some(raw) => {
                let target = self.lifecycle.parse_target(raw)?;
                authorize(actor, Operation::SetStatus(target), Some(&current))?;
                self.lifecycle.validate_status_transition(current.status, target)?;
                updated.status = target;
                Some(target)
            }
            None => None,
        };

        let saved = self.booking.commit(updated, Revision::of(&current)).await?;
        info!("Updated appointment {} ({})", saved.id, saved.status);

        if saved.symptoms != current.symptoms {
            publish_quietly(self.events.as_ref(), SchedulingEvent::symptoms_updated(&saved)).await;
        }
        if let Some(event) = target.and_then(|t| status_event(&saved, t)) {
            publish_quietly(self.events.as_ref(), event).await;
        }

        Ok(saved)
    }

    // ==============================================================================
    // APPROVE / REJECT
    // ==============================================================================

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id))]
    pub async fn approve(
        &self,
        id: Uuid,
        actor: &User,
        request: ApproveAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.load(id).await?;
        authorize(actor, Operation::Approve, Some(&current))?;
        self.lifecycle
            .validate_status_transition(current.status, AppointmentStatus::Approved)?;

        let mut updated = current.clone();
        if request.date.is_some() || request.time.is_some() {
            let date = request.date.unwrap_or(current.requested_date);
            let time = request.time.unwrap_or(current.requested_time);
            updated.requested_date = date;
            updated.requested_time = self.ensure_exact_slot(date, time).await?;
        }
        if updated.assigned_staff_id.is_none() && actor.role == Role::Staff {
            updated.assigned_staff_id = Some(actor.id);
        }
        updated.status = AppointmentStatus::Approved;
        updated.rejection_reason = None;

        let saved = self.booking.commit(updated, Revision::of(&current)).await?;
        info!("Appointment {} approved by {}", saved.id, actor.id);
        publish_quietly(self.events.as_ref(), SchedulingEvent::approved(&saved)).await;

        Ok(saved)
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id))]
    pub async fn reject(
        &self,
        id: Uuid,
        actor: &User,
        request: RejectAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.load(id).await?;
        authorize(actor, Operation::Reject, Some(&current))?;
        self.lifecycle
            .validate_status_transition(current.status, AppointmentStatus::Rejected)?;

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let mut updated = current.clone();
        updated.status = AppointmentStatus::Rejected;
        updated.rejection_reason = reason.clone();

        let saved = self.booking.commit(updated, Revision::of(&current)).await?;
        info!("Appointment {} rejected by {}", saved.id, actor.id);
        publish_quietly(self.events.as_ref(), SchedulingEvent::rejected(&saved, reason)).await;

        Ok(saved)
    }

    // ==============================================================================
    // DELETE
    // ==============================================================================

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_appointment(&self, id: Uuid, actor: &User) -> Result<(), SchedulingError> {
        let current = self.load(id).await?;
        authorize(actor, Operation::Delete, Some(&current))?;
        self.lifecycle.ensure_deletable(current.status)?;

        let removed = self.appointments.delete(id, current.status).await?;
        info!("Appointment {} deleted by {} {}", id, actor.role, actor.id);

        // Only a live appointment was holding a slot worth announcing.
        if removed.is_live() {
            publish_quietly(
                self.events.as_ref(),
                SchedulingEvent::cancelled(&removed, Some("Appointment deleted".to_string())),
            )
            .await;
        }

        Ok(())
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get_appointment(&self, id: Uuid, actor: &User) -> Result<Appointment, SchedulingError> {
        let appointment = self.load(id).await?;
        authorize(actor, Operation::View, Some(&appointment))?;
        Ok(appointment)
    }

    /// Requesters only ever see their own appointments, whatever the filter says.
    pub async fn list_appointments(
        &self,
        actor: &User,
        mut filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if actor.role == Role::Requester {
            filter.requester_id = Some(actor.id);
        }
        Ok(self.appointments.list(&filter).await?)
    }

    /// Pending appointments, highest priority first, then oldest slot first.
    /// Sorted on every read; nothing is cached between calls.
    pub async fn pending_queue(&self, actor: &User) -> Result<Vec<Appointment>, SchedulingError> {
        authorize(actor, Operation::ViewPendingQueue, None)?;

        let filter = AppointmentFilter {
            status: Some(AppointmentStatus::Pending),
            ..Default::default()
        };
        let mut pending = self.appointments.list(&filter).await?;

        if actor.role == Role::Staff {
            let group = self.directory.get(actor.id).await?.map(|p| p.specialty_group);
            pending.retain(|a| {
                a.is_assigned_to(actor.id)
                    || group
                        .as_deref()
                        .is_some_and(|g| a.health_issue_category.eq_ignore_ascii_case(g))
            });
        }

        sort_queue(&mut pending);
        debug!("Pending queue for {} has {} entries", actor.id, pending.len());
        Ok(pending)
    }

    // ==============================================================================
    // BLACKOUTS
    // ==============================================================================

    /// Closes `date` and cancels every live appointment on it in the same write.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id, date = %request.date))]
    pub async fn add_blackout_date(
        &self,
        actor: &User,
        request: AddBlackoutRequest,
    ) -> Result<BlackoutOutcome, SchedulingError> {
        authorize(actor, Operation::ManageBlackouts, None)?;

        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(SchedulingError::Validation("Blackout reason is required".to_string()));
        }

        let blackout = BlackoutDate {
            date: request.date,
            reason,
            category: request.category.trim().to_string(),
            created_at: Utc::now(),
        };
        let cancel_reason = format!("Blackout: {}", blackout.reason);
        let cancelled = self.blackouts.add_blackout(blackout.clone()).await?;

        info!("Blackout {} added, {} appointments cancelled", blackout.date, cancelled.len());
        for appointment in &cancelled {
            publish_quietly(
                self.events.as_ref(),
                SchedulingEvent::cancelled(appointment, Some(cancel_reason.clone())),
            )
            .await;
        }

        Ok(BlackoutOutcome {
            blackout,
            cancelled_appointment_ids: cancelled.iter().map(|a| a.id).collect(),
        })
    }

    pub async fn list_blackout_dates(&self) -> Result<Vec<BlackoutDate>, SchedulingError> {
        Ok(self.blackouts.list_blackouts().await?)
    }

    /// Re-opens `date`. Appointments cancelled by the blackout stay cancelled.
    pub async fn remove_blackout_date(
        &self,
        actor: &User,
        date: NaiveDate,
    ) -> Result<BlackoutDate, SchedulingError> {
        authorize(actor, Operation::ManageBlackouts, None)?;

        let removed = self
            .blackouts
            .remove_blackout(date)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("No blackout on {}", date)))?;

        info!("Blackout {} removed by {}", date, actor.id);
        Ok(removed)
    }

    // ==============================================================================
    // HELPERS
    // ==============================================================================

    async fn load(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.appointments
            .get(id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("Appointment {} not found", id)))
    }

    fn validate_category(&self, category: &str) -> Result<String, SchedulingError> {
        if !self.config.is_allowed_category(category) {
            return Err(SchedulingError::Validation(format!(
                "Unknown health issue category '{}'; expected one of: {}",
                category,
                self.config.categories.join(", ")
            )));
        }
        Ok(category.trim().to_lowercase())
    }

    /// Staff-supplied slots are taken literally: no rounding and no fallback.
    async fn ensure_exact_slot(&self, date: NaiveDate, time: NaiveTime) -> Result<NaiveTime, SchedulingError> {
        let calendar = self.availability.calendar();
        if !calendar.is_bookable_day(date).await? {
            return Err(SchedulingError::Validation(format!("{} is not a bookable day", date)));
        }
        let slot = calendar.grid().slot_at(date, time).ok_or_else(|| {
            SchedulingError::Validation(format!(
                "{} on {} is not a slot boundary within business hours",
                time.format("%H:%M:%S"),
                date
            ))
        })?;
        Ok(slot.start_time)
    }

    async fn ensure_provider(&self, staff_id: Uuid) -> Result<Uuid, SchedulingError> {
        match self.assignment.provider(staff_id).await? {
            Some(provider) if provider.active => Ok(provider.staff_id),
            Some(_) => Err(SchedulingError::Validation(format!(
                "Care provider {} is not active", staff_id
            ))),
            None => Err(SchedulingError::NotFound(format!(
                "Care provider {} not found", staff_id
            ))),
        }
    }

    /// A missing provider leaves the appointment unassigned rather than failing the booking.
    async fn auto_assign(&self, category: &str, date: NaiveDate, time: NaiveTime) -> Option<Uuid> {
        match self.assignment.assign(category, Some(date), Some(time)).await {
            Ok(provider) => Some(provider.staff_id),
            Err(e) => {
                warn!("Booking '{}' unassigned: {}", category, e);
                None
            }
        }
    }
}

fn validate_symptoms(symptoms: &str) -> Result<String, SchedulingError> {
    let symptoms = symptoms.trim();
    if symptoms.is_empty() {
        return Err(SchedulingError::Validation("Symptoms are required".to_string()));
    }
    Ok(symptoms.to_string())
}

fn status_event(appointment: &Appointment, target: AppointmentStatus) -> Option<SchedulingEvent> {
    match target {
        AppointmentStatus::Approved => Some(SchedulingEvent::approved(appointment)),
        AppointmentStatus::Rejected => Some(SchedulingEvent::rejected(
            appointment,
            appointment.rejection_reason.clone(),
        )),
        AppointmentStatus::Cancelled => Some(SchedulingEvent::cancelled(appointment, None)),
        _ => None,
    }
}

/// Priority high to low, then date, time and creation order.
pub fn sort_queue(pending: &mut [Appointment]) {
    pending.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.requested_date.cmp(&b.requested_date))
            .then(a.requested_time.cmp(&b.requested_time))
            .then(a.created_at.cmp(&b.created_at))
    });
}
