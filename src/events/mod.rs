//! Lifecycle notifications
//!
//! - Event: timestamped value from a closed set of variants
//! - EventBus: broadcast fan-out to any number of observers

mod bus;
mod event;

pub use bus::{DEFAULT_CAPACITY, EventBus};
pub use event::{Event, EventPayload, WorkspaceChanges};
