//! `threadloom serve` — Start the HTTP gateway.

use std::path::Path;
use std::sync::Arc;

use threadloom_config::AppConfig;
use threadloom_engine::{PlayStrategy, SessionRegistry};
use threadloom_providers::OpenAiCompatProvider;

pub async fn run(config_path: &Path, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path)?;

    let provider = Arc::new(OpenAiCompatProvider::from_config(&config.provider)?);
    let strategy = Arc::new(PlayStrategy::new(provider));
    let registry = Arc::new(SessionRegistry::discover(&config.data_dir, strategy)?);

    if registry.is_empty() {
        println!(
            "⚠️  No sessions found under {} — run `threadloom init <session-id>`",
            config.sessions_root().display()
        );
    }

    let port = port.unwrap_or(config.gateway.port);
    let addr = format!("{}:{}", config.gateway.host, port);
    println!("🧵 Threadloom gateway on http://{addr}");

    threadloom_gateway::serve(&addr, registry).await?;
    Ok(())
}
