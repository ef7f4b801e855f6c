//! Attendance tracking — who is "present" at a given point in a thread.
//!
//! Attendance is not stored anywhere; it is a fold over the system-authored
//! messages in the ancestor chain. A system message whose content contains
//! `(id) added` inserts the id into the working set, `(id) removed` removes
//! it. The free-text encoding is fragile but load-bearing (the annotations
//! double as human-readable feed entries), so it stays isolated behind this
//! resolver: callers never see the pattern.

use std::collections::BTreeSet;

use regex_lite::Regex;

use threadloom_core::{Error, MessageId, Result};
use threadloom_store::ThreadStore;

/// Knobs for the two contested behaviors of the fold.
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    /// Seed the working set with the full configured roster instead of the
    /// empty set: thread roots do not start empty.
    pub seed_full_roster: bool,

    /// Fail when a removal annotation names an id that is not currently
    /// present. Off by default: an error here depends on thread-history
    /// order and poisons every traversal past the offending message.
    pub strict_removal: bool,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            seed_full_roster: true,
            strict_removal: false,
        }
    }
}

/// Replays attendance annotations along ancestor chains.
pub struct AttendanceResolver {
    policy: AttendancePolicy,
    added: Regex,
    removed: Regex,
}

impl AttendanceResolver {
    pub fn new() -> Self {
        Self::with_policy(AttendancePolicy::default())
    }

    pub fn with_policy(policy: AttendancePolicy) -> Self {
        Self {
            policy,
            added: Regex::new(r"\((\w+)\) added").unwrap(),
            removed: Regex::new(r"\((\w+)\) removed").unwrap(),
        }
    }

    /// The ids of the characters present at `at`, sorted for deterministic
    /// display order.
    ///
    /// `at = None` (no history yet) returns the seed set. `roster_ids` is
    /// the full configured roster used for seeding.
    pub fn active_characters(
        &self,
        store: &ThreadStore,
        roster_ids: &[String],
        at: Option<&MessageId>,
    ) -> Result<Vec<String>> {
        let mut present: BTreeSet<String> = if self.policy.seed_full_roster {
            roster_ids.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };

        if let Some(at) = at {
            for message in store.ancestor_chain(at, None, true)? {
                if !message.is_system() {
                    continue;
                }
                if let Some(capture) = self.added.captures(&message.content) {
                    present.insert(capture[1].to_string());
                }
                if let Some(capture) = self.removed.captures(&message.content) {
                    let id = &capture[1];
                    if !present.remove(id) && self.policy.strict_removal {
                        return Err(Error::character_not_found(id));
                    }
                }
            }
        }

        Ok(present.into_iter().collect())
    }
}

impl Default for AttendanceResolver {
    fn default() -> Self {
        Self::new()
    }
}
