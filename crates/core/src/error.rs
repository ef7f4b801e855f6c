//! Error types for the Threadloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The taxonomy is small
//! and deliberate: `NotFound` and `InvalidArgument` are client-facing
//! rejections that name the offending identifier, `Provider` wraps the
//! completion backend's failure modes, and `Config` is fatal — a session
//! with an invalid configuration never serves traffic.

use thiserror::Error;

/// The top-level error type for all Threadloom operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced resource does not exist.
    #[error("{kind} \"{id}\" not found")]
    NotFound { kind: ResourceKind, id: String },

    /// The request itself is malformed (reserved-author misuse, bad ids).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The completion backend failed or misbehaved. Not retried at this
    /// layer; retry policy belongs to the provider itself.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Fatal configuration problem, aborts startup/reload.
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// What kind of resource a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Message,
    Character,
    Session,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Message => "Message",
            ResourceKind::Character => "Character",
            ResourceKind::Session => "Session",
        };
        write!(f, "{name}")
    }
}

impl Error {
    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Message,
            id: id.into(),
        }
    }

    pub fn character_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Character,
            id: id.into(),
        }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Session,
            id: id.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault (4xx-class) rather than a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidArgument(_))
    }
}

// --- Bounded context errors ---

/// Failure modes of a completion provider call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The design expects exactly one candidate continuation per call.
    #[error("Expected exactly one candidate, got {count}")]
    UnexpectedCandidates { count: usize },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}
