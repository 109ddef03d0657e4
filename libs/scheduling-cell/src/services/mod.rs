// libs/scheduling-cell/src/services/mod.rs
pub mod assignment;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod events;
pub mod lifecycle;
pub mod nearest;
pub mod permissions;
pub mod scheduler;

pub use assignment::StaffAssignmentService;
pub use availability::AvailabilityService;
pub use booking::{BookingService, ReservationDraft};
pub use calendar::{CalendarService, SlotGrid};
pub use events::{
    AppointmentEventPayload, ChannelEventSink, EventError, EventSink, SchedulingEvent,
    TracingEventSink,
};
pub use lifecycle::AppointmentLifecycleService;
pub use nearest::NearestSlotResolver;
pub use permissions::{authorize, Operation};
pub use scheduler::SchedulingService;
