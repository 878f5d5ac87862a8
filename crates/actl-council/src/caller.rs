//! The injected model-calling seam.
//!
//! Production wiring points this at whatever LLM gateway an account's
//! provider uses; tests and the degraded-path exercises substitute a fake.

use async_trait::async_trait;

/// Calls a single council member (or the chairman) with a system and user
/// prompt, returning its raw text response.
#[async_trait]
pub trait LlmCaller: Send + Sync {
    /// Invokes `account`'s model with the given prompts.
    ///
    /// # Errors
    ///
    /// Returns an error string on any transport or provider failure; the
    /// council treats every error identically (drop the member).
    async fn call(&self, account: &str, system_prompt: &str, user_prompt: &str) -> Result<String, String>;
}
