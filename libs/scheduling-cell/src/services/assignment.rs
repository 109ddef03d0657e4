// libs/scheduling-cell/src/services/assignment.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::future::try_join_all;
use tracing::{debug, info};
use uuid::Uuid;

use provider_cell::{CareProvider, ProviderDirectory};

use crate::error::SchedulingError;
use crate::store::AppointmentStore;

/// Picks the least-loaded active provider in the matching specialty group.
///
/// Load is counted from live appointments at call time. Shift windows are only
/// consulted when `enforce_shift_schedule` is on; by default specialty and load
/// alone decide.
#[derive(Clone)]
pub struct StaffAssignmentService {
    directory: Arc<dyn ProviderDirectory>,
    store: Arc<dyn AppointmentStore>,
    enforce_shift_schedule: bool,
}

impl StaffAssignmentService {
    pub fn new(
        directory: Arc<dyn ProviderDirectory>,
        store: Arc<dyn AppointmentStore>,
        enforce_shift_schedule: bool,
    ) -> Self {
        Self { directory, store, enforce_shift_schedule }
    }

    pub async fn assign(
        &self,
        health_issue_category: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> Result<CareProvider, SchedulingError> {
        let mut candidates = self.directory.list_active_in_group(health_issue_category).await?;
        candidates.retain(|p| p.active && p.in_group(health_issue_category));

        if self.enforce_shift_schedule {
            if let (Some(date), Some(time)) = (date, time) {
                candidates.retain(|p| p.on_shift(date, time));
            }
        }

        let loads = try_join_all(
            candidates.iter().map(|p| self.store.count_live_for_staff(p.staff_id)),
        )
        .await?;

        debug!("{} candidates for '{}'", candidates.len(), health_issue_category);

        let chosen = select_least_loaded(candidates.into_iter().zip(loads).collect())
            .ok_or_else(|| {
                SchedulingError::NotFound(format!(
                    "No active provider available for '{}'",
                    health_issue_category
                ))
            })?;

        info!("Auto-assigned provider {} for '{}'", chosen.staff_id, health_issue_category);
        Ok(chosen)
    }

    pub async fn provider(&self, staff_id: Uuid) -> Result<Option<CareProvider>, SchedulingError> {
        Ok(self.directory.get(staff_id).await?)
    }
}

/// Lowest load wins; ties go to the lexically first name, then id.
pub fn select_least_loaded(candidates: Vec<(CareProvider, usize)>) -> Option<CareProvider> {
    candidates
        .into_iter()
        .min_by(|(a, load_a), (b, load_b)| {
            load_a
                .cmp(load_b)
                .then_with(|| a.display_name.cmp(&b.display_name))
                .then_with(|| a.staff_id.cmp(&b.staff_id))
        })
        .map(|(provider, _)| provider)
}
