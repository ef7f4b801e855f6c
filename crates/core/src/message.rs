//! Message domain types.
//!
//! Messages form a forest: every message points at most at one parent, and a
//! `parent_id` of `None` marks a thread root. Messages are immutable once
//! created — the store only appends, never mutates or deletes — so a
//! `MessageId` always resolves to the same value for the lifetime of a
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The reserved author id for system-generated messages (attendance
/// annotations, command feedback). Never a valid character id.
pub const SYSTEM_AUTHOR: &str = "system";

/// Unique identifier for a message within a session's thread store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a fresh id: a UUIDv4 rendered as 32 hex characters.
    ///
    /// Collision-resistant by construction, so no retry loop against the
    /// live id set is needed.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single message in a thread.
///
/// Serde field names match the history-log line format, so this type
/// round-trips through the JSONL log unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id, assigned at append time.
    #[serde(rename = "message_id")]
    pub id: MessageId,

    /// Parent message, `None` for a thread root.
    #[serde(rename = "parent_message_id")]
    pub parent_id: Option<MessageId>,

    /// A character id, or [`SYSTEM_AUTHOR`].
    pub author_id: String,

    /// UTC append time.
    pub timestamp: DateTime<Utc>,

    /// The text content.
    pub content: String,
}

impl Message {
    /// Whether this message was authored by the reserved system author.
    pub fn is_system(&self) -> bool {
        self.author_id == SYSTEM_AUTHOR
    }
}
