//! # Threadloom Core
//!
//! Domain types, traits, and error definitions for the Threadloom
//! conversation engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! The domain in one paragraph: a *session* owns a forest of immutable
//! *messages* (each pointing at most at one parent) plus a fixed roster of
//! *characters*, each carrying public and private narrative knowledge. Humans
//! post messages as a character; agent turns are synthesized by assembling a
//! prompt from the ancestor chain and the roster, sending it to an opaque
//! *completion provider*, and committing the reply as a new message.
//!
//! Everything with an implementation choice behind it (completion backends,
//! turn-generation policies) is defined as a trait here so implementations
//! can be swapped via configuration and stubbed in tests.

pub mod character;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use character::{Character, validate_character_id};
pub use error::{Error, ProviderError, ResourceKind, Result};
pub use message::{Message, MessageId, SYSTEM_AUTHOR};
pub use provider::{CompletionProvider, PromptBlock, PromptRole};
