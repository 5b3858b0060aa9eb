pub mod analytics;
pub mod ask;
pub mod config_cmd;
pub mod serve;

use std::path::Path;

use studentdesk_config::AppConfig;

/// Load from `path` when given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))
}
