//! Declared strength skills per provider type, used by the `providerFit`
//! scoring component. The exact mapping is this crate's own call; see
//! `DESIGN.md` for the reasoning.

use actl_core::ProviderType;

/// The skills a provider type is declared strong at.
#[must_use]
pub fn provider_strengths(provider_type: ProviderType) -> &'static [&'static str] {
    match provider_type {
        ProviderType::Reasoning => &["architecture", "planning", "debugging", "research"],
        ProviderType::Throughput => &["boilerplate", "testing", "refactoring", "formatting"],
        ProviderType::Agentic => &["tooling", "automation", "integration", "orchestration"],
    }
}
