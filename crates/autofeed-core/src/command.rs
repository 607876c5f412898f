// ── Command API ──
//
// All device and schedule mutations flow through a unified `Command` enum.
// The controller's command processor handles them one at a time, in the
// order they were submitted.

use autofeed_api::Schedule;

use crate::error::CoreError;
use crate::model::CommandId;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All user-initiated write operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Device operations ────────────────────────────────────────────
    Feed { amount_grams: u32 },
    DispenseWater { amount_ml: u32 },
    Refill,

    // ── Schedule operations ──────────────────────────────────────────
    CreateSchedule { time: String, amount_grams: u32 },
    DeleteSchedule { id: String },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    /// The service accepted a feed/water command. The device has not
    /// necessarily finished dispensing.
    Accepted {
        id: CommandId,
        message: Option<String>,
    },
    Refilled {
        container_weight_grams: u32,
        message: Option<String>,
    },
    /// The service's echo of the new schedule, when it sent one.
    ScheduleCreated(Option<Schedule>),
    ScheduleDeleted,
}
