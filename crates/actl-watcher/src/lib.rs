//! Translates external agent session-state files into hub lifecycle events.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod session;
mod watcher;

pub use error::WatcherError;
pub use session::{checkpoint_percent, diff_session, Correlation, SessionFile, SessionPhase};
pub use watcher::SessionWatcher;
