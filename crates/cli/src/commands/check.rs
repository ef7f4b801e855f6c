//! `threadloom check` — Validate the configuration and every session.

use std::path::Path;

use threadloom_config::{AppConfig, SESSION_CONFIG_FILE, SessionConfig};

pub fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧵 Threadloom — Configuration Check");
    println!("===================================\n");

    let mut issues = 0;

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ App config valid ({})", config_path.display());
            config
        }
        Err(err) => {
            println!("  ❌ App config invalid: {err}");
            return Err(err.into());
        }
    };

    if config.provider.resolve_api_key().is_none() {
        println!("  ⚠️  No API key — set provider.api_key or THREADLOOM_API_KEY");
        issues += 1;
    } else {
        println!("  ✅ API key configured");
    }

    let sessions_root = config.sessions_root();
    if !sessions_root.is_dir() {
        println!("  ⚠️  No session directory at {}", sessions_root.display());
        issues += 1;
    } else {
        let mut folders: Vec<_> = std::fs::read_dir(&sessions_root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(SESSION_CONFIG_FILE).is_file())
            .collect();
        folders.sort();

        if folders.is_empty() {
            println!("  ⚠️  No sessions under {}", sessions_root.display());
            issues += 1;
        }

        for folder in folders {
            let name = folder.file_name().and_then(|n| n.to_str()).unwrap_or("?");
            match SessionConfig::load(&folder.join(SESSION_CONFIG_FILE)) {
                Ok(session) => println!(
                    "  ✅ Session \"{name}\" valid ({} characters)",
                    session.characters.len()
                ),
                Err(err) => {
                    println!("  ❌ Session \"{name}\" invalid: {err}");
                    issues += 1;
                }
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Err("configuration check failed".into())
    }
}
