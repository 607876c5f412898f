//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod reports;
pub mod schedules;
pub mod status;
pub mod util;
pub mod watch;

use autofeed_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(controller, global).await,
        Command::Watch => watch::handle(controller, global).await,
        Command::Feed { grams } => device::feed(controller, grams, global).await,
        Command::Water { ml } => device::water(controller, ml, global).await,
        Command::Refill => device::refill(controller, global).await,
        Command::Schedules(args) => schedules::handle(controller, args, global).await,
        Command::History { limit } => reports::history(controller, limit, global).await,
        Command::Analytics => reports::analytics(controller, global).await,
        Command::Health => reports::health(controller, global).await,
        // Config and Completions are handled before a controller exists
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not use the device service".into(),
        }),
    }
}
