//! Stale-task escalation and adaptive session-pressure SLA engines.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adaptive;
mod escalation;

pub use adaptive::{
    AdaptiveAction, AdaptiveDecision, AdaptiveSlaEngine, AdaptiveTrigger, Criticality,
    SessionMetrics, SessionPhase, TaskProfile,
};
pub use escalation::{
    format_escalation_message, scan_for_escalations, Escalation, EscalationAction, SlaThresholds,
};
