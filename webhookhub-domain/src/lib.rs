pub mod backoff;
pub mod classify;
pub mod idempotency;
pub mod job;
pub mod models;
pub mod schema;
pub mod signature;

pub use classify::DeliveryOutcome;
pub use job::DeliveryJob;
pub use models::{Delivery, DeliveryStatus, Destination, DestinationRule, Event, Source};
