//! Command handlers and the settings they share.

pub mod config_cmd;
pub mod simulate;

use matterlink_config::Settings;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Settings from `--settings` (or the canonical path) and the environment,
/// with `--file` taking precedence over the configured bridge file.
pub fn load_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    let mut settings = match &global.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(file) = &global.file {
        settings.config_file = Some(file.clone());
    }
    Ok(settings)
}
