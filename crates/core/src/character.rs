//! Character domain type and identifier validation.
//!
//! A character is an automated or nominal participant. The two knowledge
//! fields feed prompt construction: `public_knowledge` is visible in every
//! generated turn's prompt, `private_knowledge` only in the prompt for the
//! character's own turns. That split is the privacy boundary of the whole
//! system — nothing else enforces it.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::message::SYSTEM_AUTHOR;

/// Lowercase letter, then lowercase alphanumerics or hyphens, ending in an
/// alphanumeric (single letter allowed).
static CHARACTER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([a-z0-9-]*[a-z0-9])?$").unwrap());

/// A participant in the play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier, validated by [`validate_character_id`].
    pub id: String,

    /// Display name, used in prompts and attendance annotations.
    pub display_name: String,

    /// Display color for the UI layer.
    pub color: String,

    /// Knowledge shared with every generated turn.
    pub public_knowledge: String,

    /// Knowledge injected only into this character's own turns.
    pub private_knowledge: String,
}

/// Validate a character identifier.
///
/// Rejects anything not matching the id pattern, and the reserved token
/// `"system"` which is the system author's id.
pub fn validate_character_id(id: &str) -> Result<()> {
    if id == SYSTEM_AUTHOR {
        return Err(Error::invalid_argument(format!(
            "\"{id}\" is a reserved identifier"
        )));
    }
    if !CHARACTER_ID_PATTERN.is_match(id) {
        return Err(Error::invalid_argument(format!(
            "\"{id}\" is not a valid character identifier"
        )));
    }
    Ok(())
}
