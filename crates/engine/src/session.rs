//! The per-conversation session aggregate.
//!
//! A session binds one character directory, the scenario context, and one
//! thread store, and exposes the operations the API layer calls. It owns
//! request validation (parent exists, author known, reserved-author rules),
//! slash-command handling, and the commit step of agent turns.
//!
//! `reload()` rebuilds the whole aggregate from disk and swaps it in — the
//! directory, scenario, and store are replaced together, never mutated
//! field by field.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use threadloom_config::{HISTORY_FILE, SESSION_CONFIG_FILE, SessionConfig};
use threadloom_core::{Character, Error, Message, MessageId, Result, SYSTEM_AUTHOR};
use threadloom_store::ThreadStore;

use crate::attendance::AttendanceResolver;
use crate::directory::CharacterDirectory;
use crate::strategy::{TurnInput, TurnStrategy};

/// Scenario-level context text, bracketing the character roster.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Rendered as the CONTEXT section of every generated turn's prompt.
    pub pre_prompt: String,
    /// Reserved trailing context, carried but not rendered by the play
    /// strategy.
    pub post_prompt: String,
}

/// One conversation: roster + scenario + thread store + turn strategy.
pub struct Session {
    session_id: String,
    folder: Option<PathBuf>,
    directory: CharacterDirectory,
    scenario: Scenario,
    store: ThreadStore,
    strategy: Arc<dyn TurnStrategy>,
    resolver: AttendanceResolver,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("folder", &self.folder)
            .field("scenario", &self.scenario)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Load a session from its directory (`session.toml` + `history.jsonl`).
    pub fn load(
        session_id: impl Into<String>,
        folder: &Path,
        strategy: Arc<dyn TurnStrategy>,
    ) -> Result<Self> {
        let config = SessionConfig::load(&folder.join(SESSION_CONFIG_FILE))?;
        Self::build(session_id.into(), Some(folder.to_path_buf()), config, strategy)
    }

    /// Build a session with no backing directory. History lives only in
    /// memory; used by tests and ephemeral sessions.
    pub fn from_config(
        session_id: impl Into<String>,
        config: SessionConfig,
        strategy: Arc<dyn TurnStrategy>,
    ) -> Result<Self> {
        Self::build(session_id.into(), None, config, strategy)
    }

    fn build(
        session_id: String,
        folder: Option<PathBuf>,
        config: SessionConfig,
        strategy: Arc<dyn TurnStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        let directory = CharacterDirectory::new(config.characters()).map_err(|err| match err {
            Error::InvalidArgument(message) => Error::config(message),
            other => other,
        })?;

        let store = match &folder {
            Some(folder) => ThreadStore::open(folder.join(HISTORY_FILE), directory.ids())?,
            None => ThreadStore::in_memory(directory.ids()),
        };

        debug!(
            session = %session_id,
            characters = directory.len(),
            messages = store.len(),
            "Session ready"
        );

        Ok(Self {
            session_id,
            folder,
            directory,
            scenario: Scenario {
                pre_prompt: config.pre_prompt,
                post_prompt: config.post_prompt,
            },
            store,
            strategy,
            resolver: AttendanceResolver::new(),
        })
    }

    /// Rebuild the whole aggregate from the backing directory and swap it
    /// in atomically. Used at startup and for hot-reload.
    pub fn reload(&mut self) -> Result<()> {
        let folder = self.folder.clone().ok_or_else(|| {
            Error::invalid_argument(format!(
                "session \"{}\" has no backing directory to reload from",
                self.session_id
            ))
        })?;
        let fresh = Session::load(self.session_id.clone(), &folder, self.strategy.clone())?;
        *self = fresh;
        info!(session = %self.session_id, "Session reloaded");
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn list_characters(&self) -> &[Character] {
        self.directory.list_all()
    }

    pub fn get_character(&self, id: &str) -> Result<&Character> {
        self.directory.get(id)
    }

    pub fn list_messages(&self) -> &[Message] {
        self.store.list_all()
    }

    pub fn get_message(&self, id: &MessageId) -> Result<&Message> {
        self.store.get(id)
    }

    /// The sorted ids of the characters present at `message_id`.
    pub fn active_characters_at(&self, message_id: &MessageId) -> Result<Vec<String>> {
        self.resolver
            .active_characters(&self.store, &self.directory.ids(), Some(message_id))
    }

    /// Post a human-authored message, or handle it as a command when the
    /// content is slash-prefixed.
    ///
    /// Commands are committed as system-authored messages; command
    /// degradation (unknown command, unresolvable name) is informational,
    /// never a hard failure.
    pub fn post_user_message(
        &mut self,
        parent_id: Option<&MessageId>,
        author_id: &str,
        content: &str,
    ) -> Result<Message> {
        if let Some(parent_id) = parent_id {
            self.store.get(parent_id)?;
        }
        if !self.store.is_known_author(author_id) {
            return Err(Error::character_not_found(author_id));
        }

        if content.starts_with('/') {
            let feedback = self.handle_command(content);
            return self.store.append(parent_id, SYSTEM_AUTHOR, &feedback);
        }

        if author_id == SYSTEM_AUTHOR {
            return Err(Error::invalid_argument(format!(
                "Cannot post a user message as \"{SYSTEM_AUTHOR}\""
            )));
        }
        self.store.append(parent_id, author_id, content)
    }

    /// Generate and commit one agent turn.
    ///
    /// With `character_id = None` the strategy picks the speaker. Nothing
    /// is appended unless generation succeeds, so a failed turn leaves no
    /// trace in the thread.
    pub async fn post_agent_message(
        &mut self,
        parent_id: Option<&MessageId>,
        character_id: Option<&str>,
    ) -> Result<Message> {
        if let Some(parent_id) = parent_id {
            self.store.get(parent_id)?;
        }

        let target = match character_id {
            Some(SYSTEM_AUTHOR) => {
                return Err(Error::invalid_argument(format!(
                    "Cannot generate a turn as \"{SYSTEM_AUTHOR}\""
                )));
            }
            Some(id) => {
                self.directory.get(id)?;
                id.to_string()
            }
            None => {
                self.strategy
                    .choose_character(&self.directory, &self.store, parent_id)
                    .await?
            }
        };

        let input = TurnInput {
            directory: &self.directory,
            store: &self.store,
            scenario: &self.scenario,
            parent_id,
            character_id: &target,
        };
        let content = self.strategy.generate(input).await?;

        self.store.append(parent_id, &target, &content)
    }

    /// Dispatch a slash command, returning the system feedback text.
    fn handle_command(&self, command: &str) -> String {
        let body = command.strip_prefix('/').unwrap_or(command);
        let name: String = body
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let payload = body[name.len()..].trim_start();

        match name.to_lowercase().as_str() {
            "add" => match self.directory.resolve_character(payload) {
                Ok(character) => {
                    format!("**{} ({}) added.**", character.display_name, character.id)
                }
                Err(_) => format!("**\"{payload}\" not found, cannot add.**"),
            },
            "remove" => match self.directory.resolve_character(payload) {
                Ok(character) => {
                    format!("**{} ({}) removed.**", character.display_name, character.id)
                }
                Err(_) => format!("**\"{payload}\" not found, cannot remove.**"),
            },
            other => format!("**Command /{other} not found.**"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ScriptedStrategy, ScriptedTurn};
    use threadloom_config::CharacterConfig;

    fn sample_config() -> SessionConfig {
        SessionConfig {
            pre_prompt: "A rainy evening.".into(),
            post_prompt: String::new(),
            characters: vec![
                CharacterConfig {
                    id: "alice".into(),
                    name: "Alice".into(),
                    color: "teal".into(),
                    public_prompt: "The innkeeper.".into(),
                    private_prompt: "She hides a letter.".into(),
                },
                CharacterConfig {
                    id: "bob".into(),
                    name: "Bob".into(),
                    color: "black".into(),
                    public_prompt: "A sailor.".into(),
                    private_prompt: "He lost his ship.".into(),
                },
            ],
        }
    }

    fn session_with(turns: Vec<ScriptedTurn>) -> Session {
        Session::from_config("test", sample_config(), Arc::new(ScriptedStrategy::new(turns)))
            .unwrap()
    }

    #[test]
    fn user_message_round_trip() {
        let mut session = session_with(vec![]);
        let root = session.post_user_message(None, "alice", "Hello").unwrap();
        assert_eq!(root.author_id, "alice");
        assert_eq!(session.get_message(&root.id).unwrap().content, "Hello");
    }

    #[test]
    fn user_message_rejects_missing_parent_and_unknown_author() {
        let mut session = session_with(vec![]);
        let missing = MessageId::from("deadbeef");
        assert!(session.post_user_message(Some(&missing), "alice", "Hi").is_err());
        assert!(session.post_user_message(None, "mallory", "Hi").is_err());
        assert!(session.list_messages().is_empty());
    }

    #[test]
    fn user_message_rejects_reserved_author() {
        let mut session = session_with(vec![]);
        let err = session
            .post_user_message(None, SYSTEM_AUTHOR, "I am the narrator")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn remove_command_produces_exact_annotation_and_updates_attendance() {
        let mut session = session_with(vec![]);
        let root = session.post_user_message(None, "alice", "Hello").unwrap();
        let note = session
            .post_user_message(Some(&root.id), "alice", "/remove bob")
            .unwrap();

        assert_eq!(note.author_id, SYSTEM_AUTHOR);
        assert_eq!(note.content, "**Bob (bob) removed.**");

        let present = session.active_characters_at(&note.id).unwrap();
        assert_eq!(present, ["alice"]);
        // Before the annotation, bob was present
        let before = session.active_characters_at(&root.id).unwrap();
        assert_eq!(before, ["alice", "bob"]);
    }

    #[test]
    fn add_command_resolves_fuzzy_names() {
        let mut session = session_with(vec![]);
        let note = session.post_user_message(None, "alice", "/add Bobb").unwrap();
        assert_eq!(note.content, "**Bob (bob) added.**");
    }

    #[test]
    fn unresolvable_command_payload_degrades_to_feedback() {
        let mut session = session_with(vec![]);
        let note = session.post_user_message(None, "alice", "/add zorp").unwrap();
        assert_eq!(note.content, "**\"zorp\" not found, cannot add.**");
        assert_eq!(note.author_id, SYSTEM_AUTHOR);

        let note = session.post_user_message(None, "alice", "/remove zorp").unwrap();
        assert_eq!(note.content, "**\"zorp\" not found, cannot remove.**");
    }

    #[test]
    fn unknown_command_degrades_to_feedback() {
        let mut session = session_with(vec![]);
        let note = session.post_user_message(None, "alice", "/dance").unwrap();
        assert_eq!(note.content, "**Command /dance not found.**");
    }

    #[tokio::test]
    async fn agent_turn_commits_with_target_author_and_parent() {
        let mut session = session_with(vec![ScriptedTurn::new("bob", "Evening, all.")]);
        let root = session.post_user_message(None, "alice", "Hello").unwrap();

        let turn = session
            .post_agent_message(Some(&root.id), None)
            .await
            .unwrap();
        assert_eq!(turn.author_id, "bob");
        assert_eq!(turn.content, "Evening, all.");
        assert_eq!(turn.parent_id.as_ref(), Some(&root.id));
    }

    #[tokio::test]
    async fn agent_turn_rejects_reserved_and_unknown_targets() {
        let mut session = session_with(vec![]);

        let err = session
            .post_agent_message(None, Some(SYSTEM_AUTHOR))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = session
            .post_agent_message(None, Some("mallory"))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn failed_turn_appends_nothing() {
        // An exhausted script fails generation
        let mut session = session_with(vec![]);
        let root = session.post_user_message(None, "alice", "Hello").unwrap();

        let err = session
            .post_agent_message(Some(&root.id), Some("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(session.list_messages().len(), 1);
    }

    #[test]
    fn load_and_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SESSION_CONFIG_FILE),
            r#"
pre-prompt = "A rainy evening."

[[characters]]
id = "alice"
name = "Alice"
public-prompt = "The innkeeper."
private-prompt = ""
"#,
        )
        .unwrap();

        let strategy = Arc::new(ScriptedStrategy::new(vec![]));
        let mut session = Session::load("harbor", dir.path(), strategy).unwrap();
        let root = session.post_user_message(None, "alice", "Hello").unwrap();

        // Reload rebuilds the aggregate from disk; history survives
        session.reload().unwrap();
        assert_eq!(session.list_messages().len(), 1);
        assert_eq!(session.get_message(&root.id).unwrap(), &root);
        assert_eq!(session.scenario().pre_prompt, "A rainy evening.");
    }

    #[test]
    fn in_memory_session_cannot_reload() {
        let mut session = session_with(vec![]);
        assert!(session.reload().is_err());
    }
}
