//! Fan-out of batch events to any number of listeners.

pub mod events;

pub use events::{BatchEvent, EventBroadcaster};
