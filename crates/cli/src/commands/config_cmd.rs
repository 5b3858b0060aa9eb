//! `studentdesk config`: print configuration.

use std::path::Path;

use studentdesk_config::AppConfig;

pub fn run(config_path: Option<&Path>, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = super::load_config(config_path)?;
    let has_key = config.has_api_key();
    // Never echo the key itself
    config.provider.api_key = None;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    println!("# Loaded from {}", path.display());
    println!("# API key: {}", if has_key { "set" } else { "not set (demo mode)" });
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
