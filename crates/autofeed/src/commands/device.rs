//! Feed, water, and refill handlers.

use autofeed_core::{Command as CoreCommand, CommandResult, Controller};

use crate::cli::GlobalOpts;
use crate::error::CliError;

fn report(result: &CommandResult, what: &str, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    match result {
        CommandResult::Accepted { id, message } => {
            eprintln!("{what} requested (command {id})");
            if let Some(message) = message {
                eprintln!("  {message}");
            }
        }
        CommandResult::Refilled {
            container_weight_grams,
            message,
        } => {
            eprintln!("Container refilled: {container_weight_grams} g");
            if let Some(message) = message {
                eprintln!("  {message}");
            }
        }
        CommandResult::ScheduleCreated(_) | CommandResult::ScheduleDeleted => {
            eprintln!("{what} done");
        }
    }
}

pub async fn feed(controller: &Controller, grams: u32, global: &GlobalOpts) -> Result<(), CliError> {
    let result = controller
        .execute(CoreCommand::Feed {
            amount_grams: grams,
        })
        .await?;
    report(&result, &format!("Feeding {grams}g"), global);
    Ok(())
}

pub async fn water(controller: &Controller, ml: u32, global: &GlobalOpts) -> Result<(), CliError> {
    let result = controller
        .execute(CoreCommand::DispenseWater { amount_ml: ml })
        .await?;
    report(&result, &format!("Dispensing {ml}ml"), global);
    Ok(())
}

pub async fn refill(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let result = controller.execute(CoreCommand::Refill).await?;
    report(&result, "Refill", global);
    Ok(())
}
