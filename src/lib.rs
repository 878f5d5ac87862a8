//! Workspace root crate.
//!
//! This package exists only to host end-to-end scenario tests under
//! `tests/` that exercise several `actl-*` crates together. There is no
//! runtime surface here; `crates/actl-daemon` owns the `agentctld` binary.
