mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, ValueEnum};
use tracing_subscriber::EnvFilter;

use autofeed_config::{Config, FileSettingsStore};
use autofeed_core::{Controller, ControllerConfig, SettingsStore};

use crate::cli::{Cli, ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let matches = Cli::command().get_matches();
    let mut cli = Cli::from_arg_matches(&matches)
        .unwrap_or_else(|e| e.format(&mut Cli::command()).exit());
    apply_config_defaults(&mut cli.global, &matches);

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands only touch local files
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        // Shell completions generation
        Command::Completions(args) => {
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "autofeed", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the device service
        cmd => {
            let mut controller_config = build_controller_config(&cli.global)?;
            // Only `watch` keeps a poller running; one-shot commands fetch on demand.
            if !matches!(cmd, Command::Watch) {
                controller_config.poll_interval = Duration::ZERO;
            }

            let controller = Controller::new(controller_config, settings_store(&cli.global))?;
            controller.start().await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &controller, &cli.global).await;
            controller.shutdown().await;
            result
        }
    }
}

/// Fill `--output` / `--color` from the config's `[defaults]` when the
/// flags were left at their built-in defaults.
fn apply_config_defaults(global: &mut GlobalOpts, matches: &ArgMatches) {
    let Ok(cfg) = load_config(global) else {
        return;
    };
    if matches.value_source("output") == Some(ValueSource::DefaultValue) {
        if let Ok(format) = OutputFormat::from_str(&cfg.defaults.output, true) {
            global.output = format;
        }
    }
    if matches.value_source("color") == Some(ValueSource::DefaultValue) {
        if let Ok(mode) = ColorMode::from_str(&cfg.defaults.color, true) {
            global.color = mode;
        }
    }
}

/// Load the config file (or `--config-file`) plus environment.
pub(crate) fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global
        .config_file
        .clone()
        .unwrap_or_else(autofeed_config::config_path);
    Ok(autofeed_config::load_config_from(&path)?)
}

/// The settings store selected by `--settings-file`, or the platform default.
pub(crate) fn settings_store(global: &GlobalOpts) -> Arc<dyn SettingsStore> {
    let path = global
        .settings_file
        .clone()
        .unwrap_or_else(autofeed_config::settings_path);
    Arc::new(FileSettingsStore::new(path))
}

/// Build a `ControllerConfig` from the config file with CLI flag overrides.
fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let mut cfg = load_config(global)?;

    if let Some(ref url) = global.service_url {
        cfg.service.url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.service.timeout = timeout;
    }
    if global.insecure {
        cfg.service.insecure = true;
    }

    Ok(autofeed_config::to_controller_config(&cfg)?)
}
