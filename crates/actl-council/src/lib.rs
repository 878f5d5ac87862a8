//! Multi-caller council: collect independent analyses, anonymize for peer
//! review, and synthesize a final verdict through a chairman — the same
//! machine serves both task pre-analysis and post-completion verification.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod caller;
mod error;
mod parse;
mod process_caller;
mod run;
mod types;

pub use caller::LlmCaller;
pub use error::CouncilError;
pub use parse::parse_lenient_json;
pub use process_caller::ProcessLlmCaller;
pub use run::run_council;
pub use types::{AggregateRank, CouncilResult, MemberOutput, Ranking, Verdict};
