//! relay-schedule: lifecycle events and delayed follow-ups
//!
//! Maps website events (cart started/abandoned, order placed/delivered) to
//! immediate sends and durable delayed actions: cart reminders, review
//! requests and the upsell that follows a review.

pub mod clock;
pub mod error;
mod events;
mod scheduler;
mod timers;

pub use clock::{Clock, SystemClock, TokioClock};
pub use error::{Result, ScheduleError};
pub use events::{LifecycleEvent, LifecycleEventKind};
pub use scheduler::{ArmedAction, EventOutcome, EventScheduler};
pub use timers::{TimerKey, TimerTable};
