//! Deterministic scripted strategy — fixed turns, no provider.
//!
//! Replays a queue of (character, line) pairs in order. Used in tests and
//! demos where the conversation must be reproducible.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use threadloom_core::{Error, MessageId, ProviderError, Result};
use threadloom_store::ThreadStore;

use crate::directory::CharacterDirectory;
use crate::strategy::{TurnInput, TurnStrategy};

/// One pre-scripted turn.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub character_id: String,
    pub content: String,
}

impl ScriptedTurn {
    pub fn new(character_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            content: content.into(),
        }
    }
}

/// Replays a fixed script of turns.
pub struct ScriptedStrategy {
    turns: Mutex<VecDeque<ScriptedTurn>>,
}

impl ScriptedStrategy {
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
        }
    }

    pub async fn remaining(&self) -> usize {
        self.turns.lock().await.len()
    }

    fn exhausted() -> Error {
        Error::Provider(ProviderError::NotConfigured(
            "scripted strategy has no turns left".into(),
        ))
    }
}

#[async_trait]
impl TurnStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn choose_character(
        &self,
        _directory: &CharacterDirectory,
        _store: &ThreadStore,
        _parent_id: Option<&MessageId>,
    ) -> Result<String> {
        let turns = self.turns.lock().await;
        turns
            .front()
            .map(|turn| turn.character_id.clone())
            .ok_or_else(Self::exhausted)
    }

    async fn generate(&self, input: TurnInput<'_>) -> Result<String> {
        let mut turns = self.turns.lock().await;
        let turn = turns.pop_front().ok_or_else(Self::exhausted)?;
        if turn.character_id != input.character_id {
            return Err(Error::invalid_argument(format!(
                "scripted turn expects \"{}\", got \"{}\"",
                turn.character_id, input.character_id
            )));
        }
        Ok(turn.content)
    }
}
