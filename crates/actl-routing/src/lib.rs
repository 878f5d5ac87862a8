//! Weighted capability scoring and account ranking for task routing.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod provider;
mod rank;
mod score;

pub use provider::provider_strengths;
pub use rank::{rank_accounts, Candidate, RankOptions, RankedAccount};
pub use score::{score_candidate, ScoreComponent, ScoreResult, ScoringInput};
