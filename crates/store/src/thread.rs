//! The thread store: in-memory message forest plus append-only JSONL log.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use threadloom_core::{Error, Message, MessageId, Result, SYSTEM_AUTHOR};

/// One session's message forest.
///
/// The set of valid author ids is fixed at construction; the store is
/// rebuilt wholesale on session reload, so the roster never changes under
/// it. `"system"` is always a valid author.
#[derive(Debug)]
pub struct ThreadStore {
    messages: Vec<Message>,
    by_id: HashMap<String, usize>,
    authors: HashSet<String>,
    log_path: Option<PathBuf>,
}

impl ThreadStore {
    /// A store with no backing log. Used by tests and ephemeral sessions.
    pub fn in_memory(author_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            messages: Vec::new(),
            by_id: HashMap::new(),
            authors: author_ids.into_iter().collect(),
            log_path: None,
        }
    }

    /// Open a store backed by a JSONL history log, loading any existing
    /// lines. A missing file starts the store empty; the file is created on
    /// first append.
    ///
    /// The log is authoritative session state, not a best-effort cache: a
    /// malformed line fails the load rather than being skipped.
    pub fn open(log_path: PathBuf, author_ids: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut store = Self::in_memory(author_ids);

        let raw = match std::fs::read_to_string(&log_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let message: Message = serde_json::from_str(line).map_err(|err| {
                Error::config(format!(
                    "corrupt history line {} in {}: {err}",
                    number + 1,
                    log_path.display()
                ))
            })?;
            if store.by_id.contains_key(message.id.as_str()) {
                return Err(Error::config(format!(
                    "duplicate message id \"{}\" in {}",
                    message.id,
                    log_path.display()
                )));
            }
            store.insert(message);
        }

        debug!(
            path = %log_path.display(),
            count = store.messages.len(),
            "History log loaded"
        );
        store.log_path = Some(log_path);
        Ok(store)
    }

    fn insert(&mut self, message: Message) {
        self.by_id
            .insert(message.id.as_str().to_string(), self.messages.len());
        self.messages.push(message);
    }

    /// Whether `author_id` may author messages in this store.
    pub fn is_known_author(&self, author_id: &str) -> bool {
        author_id == SYSTEM_AUTHOR || self.authors.contains(author_id)
    }

    /// Append a new message and return it.
    ///
    /// Validates the parent reference and the author, stamps the current
    /// UTC time, and assigns a fresh collision-resistant id. With a backing
    /// log, the line is written before the message becomes visible in
    /// memory, so readers never observe a message that was not durably
    /// recorded.
    pub fn append(
        &mut self,
        parent_id: Option<&MessageId>,
        author_id: &str,
        content: &str,
    ) -> Result<Message> {
        if let Some(parent_id) = parent_id {
            if !self.by_id.contains_key(parent_id.as_str()) {
                return Err(Error::message_not_found(parent_id.as_str()));
            }
        }
        if !self.is_known_author(author_id) {
            return Err(Error::character_not_found(author_id));
        }

        let message = Message {
            id: MessageId::generate(),
            parent_id: parent_id.cloned(),
            author_id: author_id.to_string(),
            timestamp: Utc::now(),
            content: content.to_string(),
        };

        if let Some(path) = &self.log_path {
            let line = serde_json::to_string(&message)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            writeln!(file, "{line}")?;
        }

        self.insert(message.clone());
        Ok(message)
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Result<&Message> {
        self.by_id
            .get(id.as_str())
            .map(|&index| &self.messages[index])
            .ok_or_else(|| Error::message_not_found(id.as_str()))
    }

    /// The ancestor chain at `id`, inclusive, in chronological (root-first)
    /// order.
    ///
    /// `max_depth` bounds how many messages are collected (counted after
    /// the system filter). `include_system = false` drops system-authored
    /// messages, which are attendance bookkeeping rather than narrative
    /// content.
    ///
    /// A dangling parent link cannot be produced by `append`, but history
    /// loaded from an external log is checked defensively and surfaces as
    /// `NotFound`.
    pub fn ancestor_chain(
        &self,
        id: &MessageId,
        max_depth: Option<usize>,
        include_system: bool,
    ) -> Result<Vec<&Message>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            if max_depth.is_some_and(|depth| chain.len() >= depth) {
                break;
            }
            let message = self.get(current)?;
            if include_system || !message.is_system() {
                chain.push(message);
            }
            cursor = message.parent_id.as_ref();
        }

        chain.reverse();
        Ok(chain)
    }

    /// Every message, insertion order.
    pub fn list_all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
