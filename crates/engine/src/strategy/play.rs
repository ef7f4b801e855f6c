//! The play strategy: thread state in, one character's next line out.
//!
//! Builds a two-block completion request — a fixed system instruction and a
//! user block with CONTEXT / CHARACTERS / SCRIPT / TASK sections — then
//! parses the provider's single candidate back into message content.
//!
//! The privacy boundary lives here: the participant section exposes every
//! character's public knowledge, but private knowledge only for the
//! character whose turn is being generated.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use threadloom_core::{
    Character, CompletionProvider, Error, Message, MessageId, PromptBlock, Result,
};
use threadloom_store::ThreadStore;

use crate::attendance::AttendanceResolver;
use crate::directory::CharacterDirectory;
use crate::strategy::{RandomPicker, TurnInput, TurnPicker, TurnStrategy};

const SYSTEM_INSTRUCTION: &str = "You are an expert writer, helping the user write the \
scenario for a play. Your style expresses the personality of the character speaking.";

/// Generates turns by prompting a completion provider.
pub struct PlayStrategy {
    provider: Arc<dyn CompletionProvider>,
    resolver: AttendanceResolver,
    picker: Box<dyn TurnPicker>,
}

impl PlayStrategy {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_picker(provider, Box::new(RandomPicker))
    }

    /// Replace the speaker-choice seam, pinning `choose_character` for
    /// tests.
    pub fn with_picker(provider: Arc<dyn CompletionProvider>, picker: Box<dyn TurnPicker>) -> Self {
        Self {
            provider,
            resolver: AttendanceResolver::new(),
            picker,
        }
    }

    fn build_prompt(&self, input: &TurnInput<'_>) -> Result<Vec<PromptBlock>> {
        let target = input.directory.get(input.character_id)?;

        let history = match input.parent_id {
            Some(parent_id) => input.store.ancestor_chain(parent_id, None, false)?,
            None => Vec::new(),
        };

        let participants = participant_block(input.directory, target);
        let context = &input.scenario.pre_prompt;
        let name = &target.display_name;

        let user = if history.is_empty() {
            format!(
                "## CONTEXT\n\n{context}\n\n\
                 ## CHARACTERS\n\n{participants}\n\n\
                 ## TASK\n\n\
                 Given the context, the characters that are in the scene, what does \
                 {name} say to start the conversation? Only reply what is said by the \
                 character, nothing more."
            )
        } else {
            let script = script_block(input.directory, &history)?;
            format!(
                "## CONTEXT\n\n{context}\n\n\
                 ## CHARACTERS\n\n{participants}\n\n\
                 ## SCRIPT\n\n{script}\n\n\
                 ## TASK\n\n\
                 Given the context, the characters that are in the scene, and the \
                 current script, what does {name} say next? Only reply what is said \
                 by the character, nothing more."
            )
        };

        Ok(vec![
            PromptBlock::system(SYSTEM_INSTRUCTION),
            PromptBlock::user(user),
        ])
    }
}

#[async_trait]
impl TurnStrategy for PlayStrategy {
    fn name(&self) -> &str {
        "play"
    }

    async fn choose_character(
        &self,
        directory: &CharacterDirectory,
        store: &ThreadStore,
        parent_id: Option<&MessageId>,
    ) -> Result<String> {
        let candidates = self
            .resolver
            .active_characters(store, &directory.ids(), parent_id)?;
        let index = self
            .picker
            .pick(&candidates)
            .ok_or_else(|| Error::invalid_argument("no characters are present to take a turn"))?;
        Ok(candidates[index].clone())
    }

    async fn generate(&self, input: TurnInput<'_>) -> Result<String> {
        let blocks = self.build_prompt(&input)?;
        debug!(
            character = input.character_id,
            prompt_chars = blocks.iter().map(|b| b.text.len()).sum::<usize>(),
            "Requesting completion"
        );

        let reply = self.provider.complete(&blocks).await?;
        debug!(reply_chars = reply.len(), "Completion received");

        let name = &input.directory.get(input.character_id)?.display_name;
        Ok(strip_speaker_prefix(name, &reply))
    }
}

/// One ` - Name: knowledge` line per configured character. The full roster
/// is exposed, not just the present set; only the target's line carries its
/// private knowledge.
fn participant_block(directory: &CharacterDirectory, target: &Character) -> String {
    directory
        .list_all()
        .iter()
        .map(|character| {
            let mut knowledge = character.public_knowledge.clone();
            if character.id == target.id {
                knowledge.push(' ');
                knowledge.push_str(&character.private_knowledge);
            }
            format!(" - {}: {}", character.display_name, knowledge)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `NAME:\ncontent` fragments joined by blank lines, chronological order.
fn script_block(directory: &CharacterDirectory, history: &[&Message]) -> Result<String> {
    let mut fragments = Vec::with_capacity(history.len());
    for message in history {
        let name = directory.get(&message.author_id)?.display_name.to_uppercase();
        fragments.push(format!("{}:\n{}", name, message.content.trim()));
    }
    Ok(fragments.join("\n\n"))
}

/// Strip one leading `DisplayName:` label, case-insensitive, with optional
/// surrounding whitespace. The model sometimes echoes the speaker label it
/// saw in the script section; anything else is returned unchanged.
fn strip_speaker_prefix(name: &str, reply: &str) -> String {
    let trimmed = reply.trim_start();

    let mut offset = 0;
    let mut reply_chars = trimmed.chars();
    for expected in name.chars() {
        match reply_chars.next() {
            Some(actual) if actual.to_lowercase().eq(expected.to_lowercase()) => {
                offset += actual.len_utf8();
            }
            _ => return reply.to_string(),
        }
    }

    match trimmed[offset..].trim_start().strip_prefix(':') {
        Some(rest) => rest.trim_start().to_string(),
        None => reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Scenario;
    use std::sync::Mutex;
    use threadloom_core::ProviderError;

    /// Records every prompt it receives and replies with a fixed string.
    struct CapturingProvider {
        reply: String,
        seen: Mutex<Vec<Vec<PromptBlock>>>,
    }

    impl CapturingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_user_text(&self) -> String {
            let seen = self.seen.lock().unwrap();
            let blocks = seen.last().expect("provider was never called");
            blocks.last().unwrap().text.clone()
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for CapturingProvider {
        fn name(&self) -> &str {
            "capturing"
        }

        async fn complete(
            &self,
            blocks: &[PromptBlock],
        ) -> std::result::Result<String, ProviderError> {
            self.seen.lock().unwrap().push(blocks.to_vec());
            Ok(self.reply.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _blocks: &[PromptBlock],
        ) -> std::result::Result<String, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    fn character(id: &str, name: &str, public: &str, private: &str) -> Character {
        Character {
            id: id.into(),
            display_name: name.into(),
            color: "black".into(),
            public_knowledge: public.into(),
            private_knowledge: private.into(),
        }
    }

    fn fixtures() -> (CharacterDirectory, ThreadStore, Scenario) {
        let directory = CharacterDirectory::new(vec![
            character("alice", "Alice", "The innkeeper.", "She hides a letter."),
            character("bob", "Bob", "A sailor.", "He lost his ship."),
        ])
        .unwrap();
        let store = ThreadStore::in_memory(directory.ids());
        let scenario = Scenario {
            pre_prompt: "A rainy evening in a harbor town.".into(),
            post_prompt: String::new(),
        };
        (directory, store, scenario)
    }

    #[tokio::test]
    async fn private_knowledge_stays_with_the_target() {
        let (directory, mut store, scenario) = fixtures();
        let root = store.append(None, "alice", "Hello").unwrap();

        let provider = CapturingProvider::new("Good evening.");
        let strategy = PlayStrategy::new(provider.clone());

        let input = TurnInput {
            directory: &directory,
            store: &store,
            scenario: &scenario,
            parent_id: Some(&root.id),
            character_id: "alice",
        };
        strategy.generate(input).await.unwrap();

        let prompt = provider.last_user_text();
        // The target's private knowledge is present, the other's is not
        assert!(prompt.contains("She hides a letter."));
        assert!(!prompt.contains("He lost his ship."));
        // Public knowledge of everyone is present
        assert!(prompt.contains("The innkeeper."));
        assert!(prompt.contains("A sailor."));
    }

    #[tokio::test]
    async fn empty_history_uses_the_opening_template() {
        let (directory, store, scenario) = fixtures();
        let provider = CapturingProvider::new("It begins.");
        let strategy = PlayStrategy::new(provider.clone());

        let input = TurnInput {
            directory: &directory,
            store: &store,
            scenario: &scenario,
            parent_id: None,
            character_id: "bob",
        };
        strategy.generate(input).await.unwrap();

        let prompt = provider.last_user_text();
        assert!(prompt.contains("start the conversation"));
        assert!(!prompt.contains("## SCRIPT"));
        assert!(prompt.contains("A rainy evening in a harbor town."));
    }

    #[tokio::test]
    async fn script_section_renders_uppercased_speakers_chronologically() {
        let (directory, mut store, scenario) = fixtures();
        let root = store.append(None, "alice", "  Hello.  ").unwrap();
        let reply = store.append(Some(&root.id), "bob", "Evening.").unwrap();
        // System annotations are bookkeeping, not narrative content
        let note = store
            .append(Some(&reply.id), threadloom_core::SYSTEM_AUTHOR, "**Bob (bob) added.**")
            .unwrap();

        let provider = CapturingProvider::new("...");
        let strategy = PlayStrategy::new(provider.clone());
        let input = TurnInput {
            directory: &directory,
            store: &store,
            scenario: &scenario,
            parent_id: Some(&note.id),
            character_id: "alice",
        };
        strategy.generate(input).await.unwrap();

        let prompt = provider.last_user_text();
        assert!(prompt.contains("## SCRIPT"));
        assert!(prompt.contains("ALICE:\nHello."));
        assert!(prompt.contains("BOB:\nEvening."));
        assert!(!prompt.contains("**Bob (bob) added.**"));
        assert!(prompt.find("ALICE:").unwrap() < prompt.find("BOB:").unwrap());
    }

    #[tokio::test]
    async fn echoed_speaker_label_is_stripped() {
        let (directory, store, scenario) = fixtures();
        let provider = CapturingProvider::new("BOB:  Hi there");
        let strategy = PlayStrategy::new(provider.clone());

        let input = TurnInput {
            directory: &directory,
            store: &store,
            scenario: &scenario,
            parent_id: None,
            character_id: "bob",
        };
        let content = strategy.generate(input).await.unwrap();
        assert_eq!(content, "Hi there");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (directory, store, scenario) = fixtures();
        let strategy = PlayStrategy::new(Arc::new(FailingProvider));

        let input = TurnInput {
            directory: &directory,
            store: &store,
            scenario: &scenario,
            parent_id: None,
            character_id: "bob",
        };
        let err = strategy.generate(input).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn choose_character_respects_attendance() {
        let (directory, mut store, _scenario) = fixtures();
        let root = store.append(None, "alice", "Hello").unwrap();
        let note = store
            .append(Some(&root.id), threadloom_core::SYSTEM_AUTHOR, "**Bob (bob) removed.**")
            .unwrap();

        let strategy = PlayStrategy::new(CapturingProvider::new("..."));
        let chosen = strategy
            .choose_character(&directory, &store, Some(&note.id))
            .await
            .unwrap();
        assert_eq!(chosen, "alice");
    }

    #[test]
    fn speaker_prefix_stripping_cases() {
        assert_eq!(strip_speaker_prefix("Bob", "BOB: Hi there"), "Hi there");
        assert_eq!(strip_speaker_prefix("Bob", "bob : Hi"), "Hi");
        assert_eq!(strip_speaker_prefix("Bob", "  Bob:Hi"), "Hi");
        // No label, or a different speaker's label: unchanged
        assert_eq!(strip_speaker_prefix("Bob", "Hi there"), "Hi there");
        assert_eq!(strip_speaker_prefix("Bob", "ALICE: Hi"), "ALICE: Hi");
        // The label must be terminated by a colon
        assert_eq!(strip_speaker_prefix("Bob", "Bobby: Hi"), "Bobby: Hi");
    }
}
