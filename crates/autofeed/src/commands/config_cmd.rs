//! Config subcommand handlers.
//!
//! `device_id` and `camera_ip` live in the local settings file, everything
//! else in the TOML config file.

use serde::Serialize;

use autofeed_config::{self as config, Config};
use autofeed_core::{DeviceSettings, SettingsProvider};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const DEVICE_ID: &str = "device_id";
const CAMERA_IP: &str = "camera_ip";

#[derive(Serialize)]
struct ConfigView {
    #[serde(flatten)]
    config: Config,
    settings: DeviceSettings,
}

#[derive(Serialize)]
struct PathsView {
    config: String,
    settings: String,
}

fn format_view(view: &ConfigView) -> Result<String, CliError> {
    toml::to_string_pretty(view).map_err(|e| CliError::Config {
        message: format!("failed to render config: {e}"),
    })
}

fn config_file(global: &GlobalOpts) -> std::path::PathBuf {
    global.config_file.clone().unwrap_or_else(config::config_path)
}

fn settings_file(global: &GlobalOpts) -> std::path::PathBuf {
    global
        .settings_file
        .clone()
        .unwrap_or_else(config::settings_path)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let settings = SettingsProvider::new(crate::settings_store(global))
                .get()
                .await?;
            let view = ConfigView {
                config: crate::load_config(global)?,
                settings,
            };
            let rendered = format_view(&view)?;
            let out = output::render_single(
                &global.output,
                &view,
                |_| rendered.trim_end().to_owned(),
                |v| v.settings.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            match key.as_str() {
                DEVICE_ID | CAMERA_IP => {
                    let provider = SettingsProvider::new(crate::settings_store(global));
                    let current = provider.get().await?;
                    let (device_id, camera_ip) = if key == DEVICE_ID {
                        (value.as_str(), current.camera_ip.as_str())
                    } else {
                        (current.device_id.as_str(), value.as_str())
                    };
                    provider.set(device_id, camera_ip).await?;
                }
                _ => {
                    let path = config_file(global);
                    let mut cfg = config::load_config_from(&path)?;
                    cfg.set_value(&key, &value)?;
                    // Reject values the controller could not start with.
                    config::to_controller_config(&cfg)?;
                    config::save_config_to(&cfg, &path)?;
                }
            }
            if !global.quiet {
                eprintln!("Set {key} = {value}");
            }
            Ok(())
        }

        ConfigCommand::Path => {
            let view = PathsView {
                config: config_file(global).display().to_string(),
                settings: settings_file(global).display().to_string(),
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| format!("Config:   {}\nSettings: {}", v.config, v.settings),
                |v| format!("{}\n{}", v.config, v.settings),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
