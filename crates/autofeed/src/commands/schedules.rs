//! Schedule command handlers.

use tabled::Tabled;

use autofeed_core::{Command as CoreCommand, CommandResult, Controller, Schedule};

use crate::cli::{GlobalOpts, SchedulesArgs, SchedulesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Device")]
    device: String,
}

impl From<&Schedule> for ScheduleRow {
    fn from(s: &Schedule) -> Self {
        Self {
            id: s.id.clone(),
            time: s.time.clone(),
            amount: format!("{} {}", s.amount, s.unit),
            device: s.device_id.clone().unwrap_or_default(),
        }
    }
}

fn detail(s: &Schedule) -> String {
    [
        format!("ID:     {}", s.id),
        format!("Time:   {}", s.time),
        format!("Amount: {} {}", s.amount, s.unit),
        format!("Device: {}", s.device_id.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: SchedulesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SchedulesCommand::List => {
            let mut schedules = controller.list_schedules().await?.as_ref().clone();
            schedules.sort_by(|a, b| a.time.cmp(&b.time));
            let out = output::render_list(&global.output, &schedules, |s| ScheduleRow::from(s), |s| {
                s.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SchedulesCommand::Add { time, grams } => {
            let result = controller
                .execute(CoreCommand::CreateSchedule {
                    time: time.clone(),
                    amount_grams: grams,
                })
                .await?;
            if let CommandResult::ScheduleCreated(Some(schedule)) = result {
                let out = output::render_single(&global.output, &schedule, detail, |s| {
                    s.id.clone()
                })?;
                output::print_output(&out, global.quiet);
            }
            if !global.quiet {
                eprintln!("Daily feeding of {grams}g at {time} scheduled");
            }
            Ok(())
        }

        SchedulesCommand::Remove { id } => {
            if !util::confirm(&format!("Remove schedule {id}?"), "schedules remove", global.yes)? {
                return Ok(());
            }
            controller
                .execute(CoreCommand::DeleteSchedule { id })
                .await?;
            if !global.quiet {
                eprintln!("Schedule removed");
            }
            Ok(())
        }
    }
}
