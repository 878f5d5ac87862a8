//! Sandboxed shell-command batch executor: a captured-output idiom
//! generalized from a trusted argument vector to arbitrary command
//! strings, guarded by a deny-list and a per-command timeout.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod runner;
mod validator;

pub use error::AcceptanceError;
pub use runner::{
    run_suite, CommandOutcome, SuiteResult, DENIED_EXIT_CODE, OUTPUT_TRUNCATION_BYTES,
    TIMEOUT_EXIT_CODE,
};
pub use validator::{validate_command, DenyReason, MAX_COMMAND_BYTES};
