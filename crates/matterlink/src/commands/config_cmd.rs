//! Config subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use matterlink_config::{
    Commissioning, ConfigError, ConfigTracker, EntityKind, FileBackend, MatterConfig, Settings,
    settings_path,
};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EntryView {
    kind: &'static str,
    uuid: String,
    name: String,
    #[serde(rename = "type")]
    device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridge: Option<String>,
    enabled: bool,
    commissioned: bool,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TYPE")]
    device_type: String,
    #[tabled(rename = "ENABLED")]
    enabled: String,
    #[tabled(rename = "COMMISSIONED")]
    commissioned: String,
}

#[derive(Debug, Serialize)]
struct PathsView {
    settings: PathBuf,
    config_file: PathBuf,
    commissioning_file: PathBuf,
    store_prefix: String,
    client_name: String,
    keepalive_secs: u64,
    restart_delay_secs: u64,
}

/// Flatten bridges, their bridged devices, and standalone devices into rows.
fn entries(config: &MatterConfig, commissioning: &Commissioning) -> Vec<EntryView> {
    let mut out = Vec::new();
    for bridge in &config.bridges {
        out.push(EntryView {
            kind: "bridge",
            uuid: bridge.uuid.clone(),
            name: bridge.name.clone(),
            device_type: String::new(),
            bridge: None,
            enabled: bridge.enabled,
            commissioned: commissioning.is_commissioned(EntityKind::Bridge, &bridge.uuid),
        });
        for device in &bridge.devices {
            out.push(EntryView {
                kind: "bridged",
                uuid: device.uuid.clone(),
                name: device.name.clone(),
                device_type: device.device_type.clone(),
                bridge: Some(bridge.uuid.clone()),
                enabled: device.enabled,
                // Bridged devices are commissioned through their bridge.
                commissioned: commissioning.is_commissioned(EntityKind::Bridge, &bridge.uuid),
            });
        }
    }
    for device in &config.devices {
        out.push(EntryView {
            kind: "device",
            uuid: device.uuid.clone(),
            name: device.name.clone(),
            device_type: device.device_type.clone(),
            bridge: None,
            enabled: device.enabled,
            commissioned: commissioning.is_commissioned(EntityKind::Device, &device.uuid),
        });
    }
    out
}

// ── Helpers ─────────────────────────────────────────────────────────

fn tracker_for(path: &Path) -> ConfigTracker {
    ConfigTracker::new(Arc::new(FileBackend::new(path)))
}

/// Load through the tracker, attaching the file path to load failures.
async fn load(tracker: &ConfigTracker, path: &Path) -> Result<MatterConfig, CliError> {
    tracker.load_config().await.map_err(|e| match e {
        ConfigError::LoadFailed { reason } => CliError::LoadFailed {
            path: path.display().to_string(),
            reason,
        },
        other => other.into(),
    })
}

/// Parse a document by extension: `.json` as JSON, anything else as TOML.
fn read_document(input: &Path) -> Result<serde_json::Value, CliError> {
    let text = std::fs::read_to_string(input).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CliError::NotFound {
                path: input.display().to_string(),
            }
        } else {
            e.into()
        }
    })?;

    let is_json = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(toml::from_str(&text)?)
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: ConfigArgs,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let path = settings.config_file();

    match args.command {
        ConfigCommand::Show => {
            let tracker = tracker_for(&path);
            let config = load(&tracker, &path).await?;
            let commissioning = tracker.get_commissioning();
            let rows = entries(&config, &commissioning);

            let out = output::render_list(
                &global.output,
                &rows,
                |e| EntryRow {
                    kind: e.kind,
                    uuid: e.uuid.clone(),
                    name: e.name.clone(),
                    device_type: e.device_type.clone(),
                    enabled: output::flag(e.enabled, color),
                    commissioned: output::flag(e.commissioned, color),
                },
                |e| e.uuid.clone(),
            );
            if out.is_empty() {
                eprintln!("No bridges or devices configured in {}", path.display());
            }
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Check => {
            if !path.exists() {
                return Err(CliError::NotFound {
                    path: path.display().to_string(),
                });
            }
            let config = load(&tracker_for(&path), &path).await?;
            config.validate()?;

            let message = format!(
                "{} is valid ({} bridges, {} devices)",
                path.display(),
                config.bridges.len(),
                config.devices.len()
            );
            output::print_output(&output::success(&message, color), global.quiet);
            Ok(())
        }

        ConfigCommand::Normalize { input, write } => {
            let config = MatterConfig::from_value(read_document(&input)?)?;

            if write {
                tracker_for(&path)
                    .save_config(&config)
                    .await
                    .map_err(|e| match e {
                        ConfigError::SaveFailed { reason } => CliError::SaveFailed {
                            path: path.display().to_string(),
                            reason,
                        },
                        other => other.into(),
                    })?;
                let message = format!("Normalized configuration written to {}", path.display());
                output::print_output(&output::success(&message, color), global.quiet);
                return Ok(());
            }

            let out = if matches!(global.output, OutputFormat::Table | OutputFormat::Plain) {
                toml::to_string_pretty(&config).map_err(ConfigError::from)?
            } else {
                output::render_single(&global.output, &config, |_| String::new(), |_| String::new())
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let backend = FileBackend::new(&path);
            let view = PathsView {
                settings: global.settings.clone().unwrap_or_else(settings_path),
                config_file: path.clone(),
                commissioning_file: backend.commissioning_path().to_path_buf(),
                store_prefix: settings.store_prefix(),
                client_name: settings.client_name.clone(),
                keepalive_secs: settings.keepalive_secs,
                restart_delay_secs: settings.restart_delay_secs,
            };

            let out = output::render_single(
                &global.output,
                &view,
                |v| {
                    format!(
                        "Settings:      {}\n\
                         Config file:   {}\n\
                         Commissioning: {}\n\
                         Store prefix:  {}\n\
                         Client name:   {}\n\
                         Keep-alive:    {}s\n\
                         Restart delay: {}s",
                        v.settings.display(),
                        v.config_file.display(),
                        v.commissioning_file.display(),
                        v.store_prefix,
                        v.client_name,
                        v.keepalive_secs,
                        v.restart_delay_secs,
                    )
                },
                |v| v.config_file.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use matterlink_config::{CommissioningStatus, CommissioningUpdate};
    use serde_json::json;

    use super::*;

    #[test]
    fn bridged_devices_follow_their_bridge() {
        let config = MatterConfig::from_value(json!({
            "bridges": [{ "uuid": "b1", "name": "Hall", "list": [{ "uuid": "d1", "type": "dimmer" }] }],
            "devices": [{ "uuid": "d2", "type": "socket" }]
        }))
        .unwrap();
        let mut commissioning = Commissioning::default();
        commissioning.apply(CommissioningUpdate {
            kind: EntityKind::Bridge,
            uuid: "b1".into(),
            status: CommissioningStatus::commissioned(true),
        });

        let rows = entries(&config, &commissioning);

        let kinds: Vec<_> = rows.iter().map(|r| (r.kind, r.uuid.as_str())).collect();
        assert_eq!(kinds, [("bridge", "b1"), ("bridged", "d1"), ("device", "d2")]);
        assert!(rows[1].commissioned);
        assert_eq!(rows[1].bridge.as_deref(), Some("b1"));
        assert!(!rows[2].commissioned);
    }
}
