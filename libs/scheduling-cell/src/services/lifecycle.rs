// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::error::SchedulingError;
use crate::models::{join_statuses, AppointmentStatus};

/// Legal status transitions. Who may request a transition is decided by the
/// permission table; this only answers whether the target is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Parses a caller-supplied target status.
    pub fn parse_target(&self, raw: &str) -> Result<AppointmentStatus, SchedulingError> {
        raw.parse::<AppointmentStatus>().map_err(SchedulingError::Validation)
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            let allowed = if valid_transitions.is_empty() {
                "none (terminal state)".to_string()
            } else {
                join_statuses(&valid_transitions)
            };
            return Err(SchedulingError::Validation(format!(
                "Cannot move appointment from {} to {}; allowed: {}",
                current_status, new_status, allowed
            )));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Approved,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Approved => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Rejected => vec![],
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Completed appointments are part of the record and can never be removed.
    pub fn ensure_deletable(&self, current_status: AppointmentStatus) -> Result<(), SchedulingError> {
        if current_status == AppointmentStatus::Completed {
            return Err(SchedulingError::Validation(
                "Completed appointments cannot be deleted or cancelled".to_string(),
            ));
        }
        Ok(())
    }

    /// Symptoms stay editable on any appointment that has not been completed.
    pub fn ensure_symptoms_editable(&self, current_status: AppointmentStatus) -> Result<(), SchedulingError> {
        if current_status == AppointmentStatus::Completed {
            return Err(SchedulingError::Validation(
                "Symptoms of a completed appointment cannot be changed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_reschedulable(&self, current_status: AppointmentStatus) -> Result<(), SchedulingError> {
        if current_status.is_terminal() {
            return Err(SchedulingError::Validation(format!(
                "A {} appointment cannot be rescheduled",
                current_status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_pending_branches() {
        let lifecycle = AppointmentLifecycleService::new();
        for target in [AppointmentStatus::Approved, AppointmentStatus::Rejected, AppointmentStatus::Cancelled] {
            assert!(lifecycle.validate_status_transition(AppointmentStatus::Pending, target).is_ok());
        }
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Pending, AppointmentStatus::Completed)
            .is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        for terminal in [AppointmentStatus::Rejected, AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            for target in AppointmentStatus::ALL {
                assert!(lifecycle.validate_status_transition(terminal, target).is_err());
            }
        }
    }

    #[test]
    fn test_illegal_transition_names_allowed_set() {
        let lifecycle = AppointmentLifecycleService::new();
        let err = lifecycle
            .validate_status_transition(AppointmentStatus::Approved, AppointmentStatus::Rejected)
            .unwrap_err();

        assert_matches!(err, SchedulingError::Validation(ref msg)
            if msg.contains("scheduled, completed, cancelled"));
    }

    #[test]
    fn test_unknown_target_is_validation_error() {
        let lifecycle = AppointmentLifecycleService::new();
        let err = lifecycle.parse_target("archived").unwrap_err();

        assert_matches!(err, SchedulingError::Validation(ref msg)
            if msg.contains("pending, approved, rejected, scheduled, completed, cancelled"));
        assert_eq!(lifecycle.parse_target(" Approved ").unwrap(), AppointmentStatus::Approved);
    }

    #[test]
    fn test_completed_is_never_deletable() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.ensure_deletable(AppointmentStatus::Completed).is_err());
        assert!(lifecycle.ensure_deletable(AppointmentStatus::Rejected).is_ok());
    }
}
