//! `threadloom init` — Scaffold a sample session directory.

use std::path::Path;

use threadloom_config::{AppConfig, SESSION_CONFIG_FILE};
use threadloom_core::validate_character_id;

const SAMPLE_SESSION: &str = r#"pre-prompt = """
A rainy evening in a small harbor town. The inn's common room is almost
empty; the fire is low and the rain is loud against the windows."""
post-prompt = ""

[[characters]]
id = "alice"
name = "Alice"
color = "teal"
public-prompt = "The innkeeper. Warm, but watchful of strangers."
private-prompt = "She is hiding a letter addressed to the harbormaster."

[[characters]]
id = "bob"
name = "Bob"
color = "navy"
public-prompt = "A sailor just off a long voyage, looking for a room."
private-prompt = "He lost his ship and cannot pay; he hopes nobody asks."
"#;

pub fn run(config_path: &Path, session_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Session ids share the character-id grammar
    validate_character_id(session_id)
        .map_err(|_| format!("\"{session_id}\" is not a valid session identifier"))?;

    let config = AppConfig::load(config_path)?;
    let folder = config.sessions_root().join(session_id);
    let file = folder.join(SESSION_CONFIG_FILE);

    if file.exists() {
        return Err(format!("session \"{session_id}\" already exists at {}", file.display()).into());
    }

    std::fs::create_dir_all(&folder)?;
    std::fs::write(&file, SAMPLE_SESSION)?;

    println!("✅ Created session \"{session_id}\"");
    println!("   {}", file.display());
    println!("   Edit the characters, then run `threadloom serve`.");
    Ok(())
}
