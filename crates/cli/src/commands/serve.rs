//! `studentdesk serve`: start the HTTP API server.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🎓 studentdesk gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.provider.model);
    if !config.has_api_key() {
        println!("   ⚠️  No API key set, answers beyond the FAQ run in demo mode");
    }

    studentdesk_gateway::start(config).await?;

    Ok(())
}
