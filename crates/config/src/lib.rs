//! Configuration loading and validation for Threadloom.
//!
//! Two configuration layers:
//!
//! - [`AppConfig`] — process-level settings (provider endpoint, gateway
//!   bind address, data directory), loaded from `threadloom.toml` with
//!   serde defaults per field.
//! - [`SessionConfig`] — one per session directory
//!   (`<data_dir>/session/<id>/session.toml`): the scenario context and the
//!   character roster.
//!
//! Validation happens at load time. An invalid character identifier rejects
//! the entire session load with a fatal configuration error; a session never
//! serves traffic with a half-valid roster.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use threadloom_core::{Character, Error, Result, validate_character_id};

/// File name of the per-session configuration inside a session directory.
pub const SESSION_CONFIG_FILE: &str = "session.toml";

/// File name of the append-only history log inside a session directory.
pub const HISTORY_FILE: &str = "history.jsonl";

// ── App-level configuration ───────────────────────────────────────────────

/// The root process configuration.
///
/// Maps directly to `threadloom.toml`. Every field has a default so an
/// empty file (or no file at all) yields a runnable local setup.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory holding `session/<id>/` directories.
    pub data_dir: PathBuf,

    /// Completion provider settings.
    pub provider: ProviderConfig,

    /// Gateway bind settings.
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file. A missing file yields the defaults; a file
    /// that exists but does not parse is a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No app config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::config(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };
        let config: Self = toml::from_str(&raw)
            .map_err(|err| Error::config(format!("failed to parse {}: {err}", path.display())))?;
        Ok(config)
    }

    /// The directory scanned for session directories.
    pub fn sessions_root(&self) -> PathBuf {
        self.data_dir.join("session")
    }
}

/// Redact a secret string for Debug output.
fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("provider", &self.provider)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Completion provider endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key. Falls back to `THREADLOOM_API_KEY`, then `OPENAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    pub api_url: String,

    /// Model name sent with every completion request.
    pub model: String,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
        }
    }
}

impl ProviderConfig {
    /// The configured key, or the first matching environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("THREADLOOM_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Gateway bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

// ── Session configuration ─────────────────────────────────────────────────

/// One session's scenario and roster, from `session.toml`.
///
/// Characters are an array of tables so the directory order is the file
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Scenario context rendered into every generated turn's prompt.
    pub pre_prompt: String,

    /// Reserved trailing context. Carried through the session aggregate but
    /// not rendered by the play strategy.
    #[serde(default)]
    pub post_prompt: String,

    #[serde(default)]
    pub characters: Vec<CharacterConfig>,
}

/// One character entry in `session.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CharacterConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub public_prompt: String,
    pub private_prompt: String,
}

fn default_color() -> String {
    "black".into()
}

impl SessionConfig {
    /// Load and validate a session configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| Error::config(format!("failed to read {}: {err}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|err| Error::config(format!("failed to parse {}: {err}", path.display())))?;
        config.validate()?;
        debug!(
            path = %path.display(),
            characters = config.characters.len(),
            "Session config loaded"
        );
        Ok(config)
    }

    /// Validate every character id and reject duplicates. Any violation is
    /// fatal for the whole configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for character in &self.characters {
            validate_character_id(&character.id).map_err(|err| match err {
                Error::InvalidArgument(message) => Error::config(message),
                other => other,
            })?;
            if !seen.insert(character.id.as_str()) {
                return Err(Error::config(format!(
                    "duplicate character identifier \"{}\"",
                    character.id
                )));
            }
        }
        Ok(())
    }

    /// Convert the roster into domain characters, directory order preserved.
    pub fn characters(&self) -> Vec<Character> {
        self.characters
            .iter()
            .map(|c| Character {
                id: c.id.clone(),
                display_name: c.name.clone(),
                color: c.color.clone(),
                public_knowledge: c.public_prompt.clone(),
                private_knowledge: c.private_prompt.clone(),
            })
            .collect()
    }
}
