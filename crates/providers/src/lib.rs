//! Completion provider implementations for Threadloom.
//!
//! The engine consumes the [`threadloom_core::CompletionProvider`] trait;
//! this crate supplies the HTTP-backed implementation. Most hosted and
//! local LLM backends expose an OpenAI-compatible `/chat/completions`
//! endpoint, so one implementation covers OpenAI, OpenRouter, Azure-style
//! proxies, Ollama, and friends.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
