// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::services::scheduler::SchedulingService;

/// Every route expects an authenticated `User` in the request extensions.
pub fn scheduling_routes(service: Arc<SchedulingService>) -> Router {
    Router::new()
        // Calendar
        .route("/slots", get(handlers::get_available_slots))

        // Appointments
        .route("/appointments", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/appointments/pending", get(handlers::get_pending_queue))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/appointments/{appointment_id}/approve", post(handlers::approve_appointment))
        .route("/appointments/{appointment_id}/reject", post(handlers::reject_appointment))

        // Blackouts (admin writes)
        .route("/blackouts", get(handlers::list_blackouts).post(handlers::add_blackout))
        .route("/blackouts/{date}", delete(handlers::remove_blackout))

        .with_state(service)
}
