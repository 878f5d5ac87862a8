//! In-process typed pub/sub event bus for the agentctl hub daemon.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod event;

pub use bus::{EventBus, Handler, DEFAULT_CAPACITY};
pub use event::{EmittedEvent, HubEvent};
