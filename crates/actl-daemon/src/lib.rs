//! The `agentctld` coordination daemon: a single Unix-socket process
//! binding the task board, message/handoff store, workspace manager,
//! routing scorer, circuit breaker, and SLA engines together behind one
//! newline-delimited JSON RPC surface.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod background;
pub mod board;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod state;
pub mod watchdog;

pub use config::{HubPaths, Intervals};
pub use state::{CouncilConfig, DaemonState};
