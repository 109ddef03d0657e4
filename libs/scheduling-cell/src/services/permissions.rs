// libs/scheduling-cell/src/services/permissions.rs
use tracing::warn;
use uuid::Uuid;

use shared_models::auth::{Role, User};

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentStatus};

/// Operations gated by role and by the caller's relation to the appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Book for `requester_id`.
    Book { requester_id: Uuid },
    /// Book into an exact slot with no nearest-slot fallback.
    BookExplicitSlot,
    View,
    EditDetails,
    Reschedule,
    SetStatus(AppointmentStatus),
    Approve,
    Reject,
    Delete,
    ViewPendingQueue,
    ManageBlackouts,
}

/// How the caller relates to the appointment under discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Owner,
    AssignedStaff,
    /// Appointment has no provider yet.
    Unclaimed,
    Unrelated,
}

fn relation(actor: &User, appointment: Option<&Appointment>) -> Relation {
    match appointment {
        None => Relation::Unrelated,
        Some(a) if a.requester_id == actor.id => Relation::Owner,
        Some(a) if a.is_assigned_to(actor.id) => Relation::AssignedStaff,
        Some(a) if a.assigned_staff_id.is_none() => Relation::Unclaimed,
        Some(_) => Relation::Unrelated,
    }
}

fn allowed(actor: &User, operation: Operation, appointment: Option<&Appointment>) -> bool {
    use Operation::*;
    use Relation::*;

    let rel = relation(actor, appointment);
    let status = appointment.map(|a| a.status);

    match (actor.role, operation) {
        (Role::Admin, _) => true,

        (Role::Requester, Book { requester_id }) => requester_id == actor.id,
        (Role::Requester, View | EditDetails | Reschedule) => rel == Owner,
        (Role::Requester, SetStatus(AppointmentStatus::Cancelled)) => rel == Owner,
        (Role::Requester, Delete) => rel == Owner,
        (Role::Requester, _) => false,

        (Role::Staff, Book { .. } | BookExplicitSlot | View | ViewPendingQueue) => true,
        (Role::Staff, EditDetails | Reschedule | SetStatus(_)) => rel == AssignedStaff,
        (Role::Staff, Approve | Reject) => matches!(rel, AssignedStaff | Unclaimed),
        (Role::Staff, Delete) => {
            rel == AssignedStaff || status == Some(AppointmentStatus::Pending)
        }
        (Role::Staff, ManageBlackouts) => false,
    }
}

/// Fails with `Forbidden` unless `actor` may perform `operation`.
pub fn authorize(
    actor: &User,
    operation: Operation,
    appointment: Option<&Appointment>,
) -> Result<(), SchedulingError> {
    if allowed(actor, operation, appointment) {
        return Ok(());
    }

    warn!("Denied {:?} for {} {} on {:?}",
          operation, actor.role, actor.id, appointment.map(|a| a.id));
    Err(SchedulingError::Forbidden(format!(
        "{} {} may not perform {:?}",
        actor.role, actor.id, operation
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime, Utc};

    use crate::models::Priority;

    fn appointment(requester_id: Uuid, staff: Option<Uuid>, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            requester_id,
            assigned_staff_id: staff,
            status,
            priority: Priority::Medium,
            health_issue_category: "physical".to_string(),
            symptoms: "Cough".to_string(),
            requested_date: NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
            requested_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_requester_powers_stop_at_own_appointments() {
        let owner = User::new(Uuid::new_v4(), Role::Requester);
        let stranger = User::new(Uuid::new_v4(), Role::Requester);
        let mine = appointment(owner.id, None, AppointmentStatus::Pending);

        assert!(authorize(&owner, Operation::View, Some(&mine)).is_ok());
        assert!(authorize(&owner, Operation::SetStatus(AppointmentStatus::Cancelled), Some(&mine)).is_ok());
        assert!(authorize(&owner, Operation::SetStatus(AppointmentStatus::Approved), Some(&mine)).is_err());
        assert!(authorize(&owner, Operation::Approve, Some(&mine)).is_err());
        assert!(authorize(&owner, Operation::BookExplicitSlot, None).is_err());
        assert_matches!(
            authorize(&stranger, Operation::EditDetails, Some(&mine)),
            Err(SchedulingError::Forbidden(_))
        );
    }

    #[test]
    fn test_staff_act_on_assigned_or_unclaimed_only() {
        let staff = User::new(Uuid::new_v4(), Role::Staff);
        let colleague = Uuid::new_v4();
        let unclaimed = appointment(Uuid::new_v4(), None, AppointmentStatus::Pending);
        let theirs = appointment(Uuid::new_v4(), Some(colleague), AppointmentStatus::Approved);
        let mine = appointment(Uuid::new_v4(), Some(staff.id), AppointmentStatus::Approved);

        assert!(authorize(&staff, Operation::Approve, Some(&unclaimed)).is_ok());
        assert!(authorize(&staff, Operation::Approve, Some(&theirs)).is_err());
        assert!(authorize(&staff, Operation::SetStatus(AppointmentStatus::Completed), Some(&mine)).is_ok());
        assert!(authorize(&staff, Operation::Delete, Some(&unclaimed)).is_ok());
        assert!(authorize(&staff, Operation::Delete, Some(&theirs)).is_err());
        assert!(authorize(&staff, Operation::ManageBlackouts, None).is_err());
    }

    #[test]
    fn test_admin_is_unrestricted() {
        let admin = User::new(Uuid::new_v4(), Role::Admin);
        let any = appointment(Uuid::new_v4(), Some(Uuid::new_v4()), AppointmentStatus::Scheduled);

        for op in [Operation::Approve, Operation::Delete, Operation::ManageBlackouts, Operation::Reschedule] {
            assert!(authorize(&admin, op, Some(&any)).is_ok());
        }
    }
}
