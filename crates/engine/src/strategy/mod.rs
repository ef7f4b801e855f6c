//! Turn strategies — how an agent turn gets generated.
//!
//! A [`TurnStrategy`] is the capability interface behind `Session`: given
//! the thread state and a target character, produce that character's next
//! line. [`PlayStrategy`] drives a completion provider; [`ScriptedStrategy`]
//! replays a fixed script, for tests and deterministic demos. Session never
//! cares which one it holds.

mod play;
mod scripted;

pub use play::PlayStrategy;
pub use scripted::{ScriptedStrategy, ScriptedTurn};

use async_trait::async_trait;

use threadloom_core::{MessageId, Result};
use threadloom_store::ThreadStore;

use crate::directory::CharacterDirectory;
use crate::session::Scenario;

/// Everything a strategy sees for one turn. Borrowed from the session for
/// the duration of the call; the store is untouched until the session
/// commits the result.
pub struct TurnInput<'a> {
    pub directory: &'a CharacterDirectory,
    pub store: &'a ThreadStore,
    pub scenario: &'a Scenario,
    /// Parent of the turn being generated, `None` when opening a thread.
    pub parent_id: Option<&'a MessageId>,
    /// The character speaking this turn. Validated by the session.
    pub character_id: &'a str,
}

/// A turn-generation policy.
#[async_trait]
pub trait TurnStrategy: Send + Sync {
    /// A human-readable name for this strategy.
    fn name(&self) -> &str;

    /// Pick the character to speak next when the caller did not name one.
    async fn choose_character(
        &self,
        directory: &CharacterDirectory,
        store: &ThreadStore,
        parent_id: Option<&MessageId>,
    ) -> Result<String>;

    /// Generate the turn's content. Must not touch the store.
    async fn generate(&self, input: TurnInput<'_>) -> Result<String>;
}

/// The choice seam inside strategies that pick a speaker, so tests can pin
/// the outcome.
pub trait TurnPicker: Send + Sync {
    /// Pick an index into `candidates`, or `None` when empty.
    fn pick(&self, candidates: &[String]) -> Option<usize>;
}

/// Uniform random choice.
pub struct RandomPicker;

impl TurnPicker for RandomPicker {
    fn pick(&self, candidates: &[String]) -> Option<usize> {
        use rand::Rng;
        if candidates.is_empty() {
            return None;
        }
        Some(rand::rng().random_range(0..candidates.len()))
    }
}
