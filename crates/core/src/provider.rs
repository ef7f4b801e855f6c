//! CompletionProvider trait — the abstraction over text-generation backends.
//!
//! A provider accepts an ordered list of role-tagged text blocks and returns
//! the generated text for a single candidate continuation. The turn strategy
//! calls `complete()` without knowing which backend is behind it.
//!
//! Implementations: OpenAI-compatible HTTP endpoints (crates/providers),
//! scripted stubs in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// The role tag of a prompt block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Backend-level instruction (voice, register, task framing).
    System,
    /// The assembled request content.
    User,
}

/// One role-tagged block of prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub role: PromptRole,
    pub text: String,
}

impl PromptBlock {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            text: text.into(),
        }
    }
}

/// The completion provider seam.
///
/// Contract: exactly one candidate continuation per call. An implementation
/// that receives zero or multiple candidates from its backend must fail with
/// [`ProviderError::UnexpectedCandidates`] rather than guessing.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send the prompt blocks and return the single generated continuation.
    async fn complete(&self, blocks: &[PromptBlock]) -> Result<String, ProviderError>;
}
