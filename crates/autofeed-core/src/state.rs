// ── Device state owner ──
//
// `DeviceModel` is the single writer of device, command, and display
// state. The poller and the dispatcher never mutate it directly; they send
// `StateUpdate` messages to the actor task, which applies them in order,
// publishes a fresh snapshot, and broadcasts edge-triggered events.

use autofeed_api::DeviceStatus;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::ThresholdAlerter;
use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::model::{
    CommandId, CommandKind, CommandPhase, CommandState, DeviceEvent, DeviceSnapshot, DeviceState,
    DisplayStatus, STATUS_ERROR, STATUS_IDLE, StatusSource, round_grams,
};

/// Outcome of one status request.
#[derive(Debug, Clone)]
pub(crate) enum PollOutcome {
    Reported(DeviceStatus),
    Unreachable,
}

/// Messages accepted by the state actor.
///
/// `scope` is the device binding generation the sender observed; updates
/// from an older binding are dropped.
#[derive(Debug, Clone)]
pub(crate) enum StateUpdate {
    Rebind {
        scope: u64,
        device_id: String,
    },
    Poll {
        scope: u64,
        outcome: PollOutcome,
    },
    CommandRequested {
        scope: u64,
        id: CommandId,
        kind: CommandKind,
        amount: Option<u32>,
    },
    CommandAccepted {
        id: CommandId,
    },
    CommandFailed {
        id: CommandId,
        reason: String,
    },
    WindowElapsed {
        id: CommandId,
    },
    Refilled {
        scope: u64,
        id: CommandId,
        container_weight: Option<f64>,
    },
}

pub(crate) struct StateEnvelope {
    pub update: StateUpdate,
    pub ack: Option<oneshot::Sender<DeviceSnapshot>>,
}

// ── Model ────────────────────────────────────────────────────────────

pub(crate) struct DeviceModel {
    scope: u64,
    capacity: u32,
    state: DeviceState,
    command: Option<CommandState>,
    display: DisplayStatus,
    /// Display as it was when the current command was requested.
    display_before_command: DisplayStatus,
    alerter: ThresholdAlerter,
}

impl DeviceModel {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            scope: 0,
            capacity: config.container_capacity,
            state: DeviceState::new("", config.container_capacity),
            command: None,
            display: DisplayStatus::default(),
            display_before_command: DisplayStatus::default(),
            alerter: ThresholdAlerter::new(config.low_food_threshold),
        }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            state: self.state.clone(),
            command: self.command.clone(),
            display: self.display.clone(),
            low_food_alert_fired: self.alerter.is_fired(),
        }
    }

    /// Apply one update and return the events it triggered.
    pub fn apply(&mut self, update: StateUpdate) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        match update {
            StateUpdate::Rebind { scope, device_id } => {
                debug!(scope, device_id = %device_id, "rebinding device state");
                self.scope = scope;
                self.state = DeviceState::new(device_id, self.capacity);
                self.command = None;
                self.display = DisplayStatus::default();
                self.display_before_command = DisplayStatus::default();
                self.alerter.reset();
            }
            StateUpdate::Poll { scope, outcome } => {
                if scope != self.scope {
                    debug!(scope, current = self.scope, "dropping stale poll result");
                    return events;
                }
                self.apply_poll(outcome, &mut events);
            }
            StateUpdate::CommandRequested {
                scope,
                id,
                kind,
                amount,
            } => {
                if scope != self.scope {
                    return events;
                }
                self.command = Some(CommandState {
                    id,
                    kind,
                    phase: CommandPhase::Requesting,
                    requested_amount: amount,
                });
                let before = std::mem::replace(
                    &mut self.display,
                    DisplayStatus::requesting(kind, amount),
                );
                // An optimistic text belongs to the command being replaced.
                self.display_before_command = if before.source == StatusSource::Remote {
                    before
                } else {
                    DisplayStatus::remote(STATUS_IDLE)
                };
            }
            StateUpdate::CommandAccepted { id } => {
                if let Some(cmd) = self.current_command(id, CommandPhase::Requesting) {
                    cmd.phase = CommandPhase::InFlight;
                    let kind = cmd.kind;
                    self.display = DisplayStatus::in_flight(kind);
                }
            }
            StateUpdate::CommandFailed { id, reason } => {
                if let Some(cmd) = self.current_command(id, CommandPhase::Requesting) {
                    debug!(command = %cmd.kind, %reason, "command failed");
                    if cmd.kind == CommandKind::Refill {
                        // A failed refill changes nothing; the caller gets the error.
                        cmd.phase = CommandPhase::Idle;
                        self.display = self.display_before_command.clone();
                    } else {
                        cmd.phase = CommandPhase::Failed;
                        self.display = DisplayStatus::remote(STATUS_ERROR);
                    }
                }
            }
            StateUpdate::WindowElapsed { id } => {
                if let Some(cmd) = self.command.as_mut().filter(|cmd| cmd.id == id) {
                    let next = match cmd.phase {
                        CommandPhase::InFlight => Some(CommandPhase::Completed),
                        CommandPhase::Failed => Some(CommandPhase::Idle),
                        _ => None,
                    };
                    if let Some(next) = next {
                        cmd.phase = next;
                        self.display = DisplayStatus::remote(STATUS_IDLE);
                    }
                }
            }
            StateUpdate::Refilled {
                scope,
                id,
                container_weight,
            } => {
                if scope != self.scope {
                    return events;
                }
                let grams = container_weight.map_or(self.capacity, round_grams);
                self.set_container(grams, &mut events);
                if let Some(cmd) = self.current_command(id, CommandPhase::Requesting) {
                    cmd.phase = CommandPhase::Completed;
                    self.display = DisplayStatus::remote(STATUS_IDLE);
                }
            }
        }
        events
    }

    fn apply_poll(&mut self, outcome: PollOutcome, events: &mut Vec<DeviceEvent>) {
        match outcome {
            PollOutcome::Reported(status) => {
                // The service answers for unknown devices too; a missing
                // flag means the answer itself is the proof of life.
                self.set_online(status.online.unwrap_or(true), events);
                if let Some(weight) = status.weight {
                    self.state.bowl_weight_grams = round_grams(weight);
                }
                if let Some(container) = status.container_weight {
                    self.set_container(round_grams(container), events);
                }
                if let Some(text) = status.status {
                    if self.display.source == StatusSource::Remote {
                        self.display.text.clone_from(&text);
                    }
                    self.state.remote_status_text = text;
                }
            }
            PollOutcome::Unreachable => self.set_online(false, events),
        }
    }

    fn set_online(&mut self, online: bool, events: &mut Vec<DeviceEvent>) {
        if self.state.online == online {
            return;
        }
        self.state.online = online;
        if online {
            info!(device_id = %self.state.device_id, "device online");
        } else {
            warn!(device_id = %self.state.device_id, "device unreachable");
        }
        events.push(DeviceEvent::ConnectivityChanged { online });
    }

    fn set_container(&mut self, grams: u32, events: &mut Vec<DeviceEvent>) {
        let grams = if grams > self.capacity {
            warn!(
                reported = grams,
                capacity = self.capacity,
                "container weight above capacity, clamping"
            );
            self.capacity
        } else {
            grams
        };
        self.state.container_weight_grams = grams;
        if let Some(container_weight_grams) = self.alerter.observe(grams) {
            warn!(container_weight_grams, "low food");
            events.push(DeviceEvent::LowFood {
                container_weight_grams,
            });
        }
    }

    fn current_command(&mut self, id: CommandId, phase: CommandPhase) -> Option<&mut CommandState> {
        self.command
            .as_mut()
            .filter(|cmd| cmd.id == id && cmd.phase == phase)
    }
}

// ── Actor task ───────────────────────────────────────────────────────

/// Sole owner of the `DeviceModel`. Publishes every change through the
/// controller's snapshot `watch` and event `broadcast` channels.
pub(crate) async fn state_actor_task(
    controller: Controller,
    mut model: DeviceModel,
    mut rx: mpsc::UnboundedReceiver<StateEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let events = model.apply(envelope.update);
                let next = model.snapshot();
                controller.publish(&next, events);
                if let Some(ack) = envelope.ack {
                    let _ = ack.send(next);
                }
            }
        }
    }
    debug!("state actor stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn model() -> DeviceModel {
        let config = ControllerConfig::new(Url::parse("http://localhost:8000").unwrap());
        let mut model = DeviceModel::new(&config);
        model.apply(StateUpdate::Rebind {
            scope: 1,
            device_id: "Feeder_01".into(),
        });
        model
    }

    fn reported(weight: f64, container: f64, status: &str) -> PollOutcome {
        PollOutcome::Reported(DeviceStatus {
            weight: Some(weight),
            container_weight: Some(container),
            online: Some(true),
            status: Some(status.into()),
            last_seen: None,
        })
    }

    fn poll(model: &mut DeviceModel, outcome: PollOutcome) -> Vec<DeviceEvent> {
        model.apply(StateUpdate::Poll { scope: 1, outcome })
    }

    #[test]
    fn poll_updates_state_and_fires_low_food_once() {
        let mut model = model();
        let events = poll(&mut model, reported(120.0, 80.0, "Idle"));

        let snap = model.snapshot();
        assert_eq!(snap.state.bowl_weight_grams, 120);
        assert_eq!(snap.state.container_weight_grams, 80);
        assert!(snap.state.online);
        assert!(snap.low_food_alert_fired);
        assert_eq!(
            events,
            vec![
                DeviceEvent::ConnectivityChanged { online: true },
                DeviceEvent::LowFood {
                    container_weight_grams: 80
                },
            ]
        );

        let again = poll(&mut model, reported(120.0, 75.0, "Idle"));
        assert!(again.is_empty());
    }

    #[test]
    fn failed_poll_keeps_stale_values() {
        let mut model = model();
        poll(&mut model, reported(42.0, 300.0, "Idle"));
        let events = poll(&mut model, PollOutcome::Unreachable);

        let snap = model.snapshot();
        assert!(!snap.state.online);
        assert_eq!(snap.state.bowl_weight_grams, 42);
        assert_eq!(snap.state.container_weight_grams, 300);
        assert_eq!(events, vec![DeviceEvent::ConnectivityChanged { online: false }]);
    }

    #[test]
    fn stale_scope_is_ignored() {
        let mut model = model();
        model.apply(StateUpdate::Rebind {
            scope: 2,
            device_id: "Feeder_02".into(),
        });
        poll(&mut model, reported(10.0, 20.0, "Feeding"));

        let snap = model.snapshot();
        assert_eq!(snap.state.device_id, "Feeder_02");
        assert_eq!(snap.state.container_weight_grams, 500);
        assert!(!snap.state.online);
    }

    #[test]
    fn optimistic_status_survives_remote_idle() {
        let mut model = model();
        let id = CommandId::new();
        model.apply(StateUpdate::CommandRequested {
            scope: 1,
            id,
            kind: CommandKind::Feed,
            amount: Some(100),
        });
        assert_eq!(model.snapshot().display.text, "Requesting 100g...");

        model.apply(StateUpdate::CommandAccepted { id });
        poll(&mut model, reported(0.0, 400.0, "Idle"));

        let snap = model.snapshot();
        assert_eq!(snap.display, DisplayStatus::optimistic("Feeding..."));
        assert_eq!(snap.state.remote_status_text, "Idle");
        assert!(snap.command_in_flight());

        model.apply(StateUpdate::WindowElapsed { id });
        let snap = model.snapshot();
        assert_eq!(snap.display, DisplayStatus::remote("Idle"));
        assert_eq!(snap.command.unwrap().phase, CommandPhase::Completed);
    }

    #[test]
    fn old_window_does_not_revert_newer_command() {
        let mut model = model();
        let first = CommandId::new();
        let second = CommandId::new();
        for id in [first, second] {
            model.apply(StateUpdate::CommandRequested {
                scope: 1,
                id,
                kind: CommandKind::DispenseWater,
                amount: Some(250),
            });
            model.apply(StateUpdate::CommandAccepted { id });
        }

        model.apply(StateUpdate::WindowElapsed { id: first });
        assert_eq!(model.snapshot().display.text, "Dispensing...");
    }

    #[test]
    fn failure_shows_error_until_window_closes() {
        let mut model = model();
        poll(&mut model, PollOutcome::Unreachable);
        let id = CommandId::new();
        model.apply(StateUpdate::CommandRequested {
            scope: 1,
            id,
            kind: CommandKind::DispenseWater,
            amount: Some(200),
        });
        model.apply(StateUpdate::CommandFailed {
            id,
            reason: "unreachable".into(),
        });
        poll(&mut model, PollOutcome::Unreachable);
        let snap = model.snapshot();
        assert_eq!(snap.display, DisplayStatus::remote("Error"));
        assert_eq!(snap.command.unwrap().phase, CommandPhase::Failed);

        model.apply(StateUpdate::WindowElapsed { id });
        let snap = model.snapshot();
        assert_eq!(snap.display, DisplayStatus::remote("Idle"));
        assert_eq!(snap.command.unwrap().phase, CommandPhase::Idle);
    }

    #[test]
    fn failed_refill_restores_previous_display() {
        let mut model = model();
        poll(&mut model, reported(0.0, 60.0, "Feeding completed"));
        let id = CommandId::new();
        model.apply(StateUpdate::CommandRequested {
            scope: 1,
            id,
            kind: CommandKind::Refill,
            amount: None,
        });
        assert_eq!(model.snapshot().display.text, "Refilling...");

        model.apply(StateUpdate::CommandFailed {
            id,
            reason: "HTTP 500".into(),
        });
        let snap = model.snapshot();
        assert_eq!(snap.display, DisplayStatus::remote("Feeding completed"));
        assert_eq!(snap.command.unwrap().phase, CommandPhase::Idle);
        assert_eq!(snap.state.container_weight_grams, 60);
        assert!(snap.low_food_alert_fired);
    }

    #[test]
    fn failure_shows_error_until_next_poll() {
        let mut model = model();
        let id = CommandId::new();
        model.apply(StateUpdate::CommandRequested {
            scope: 1,
            id,
            kind: CommandKind::Feed,
            amount: Some(10),
        });
        model.apply(StateUpdate::CommandFailed {
            id,
            reason: "boom".into(),
        });
        assert_eq!(model.snapshot().display, DisplayStatus::remote("Error"));

        poll(&mut model, reported(0.0, 400.0, "Idle"));
        assert_eq!(model.snapshot().display.text, "Idle");
    }

    #[test]
    fn refill_resets_container_and_alert() {
        let mut model = model();
        poll(&mut model, reported(0.0, 50.0, "Idle"));
        assert!(model.snapshot().low_food_alert_fired);

        let id = CommandId::new();
        model.apply(StateUpdate::CommandRequested {
            scope: 1,
            id,
            kind: CommandKind::Refill,
            amount: None,
        });
        model.apply(StateUpdate::Refilled {
            scope: 1,
            id,
            container_weight: Some(500.0),
        });

        let snap = model.snapshot();
        assert_eq!(snap.state.container_weight_grams, 500);
        assert!(!snap.low_food_alert_fired);
        assert_eq!(snap.display.text, "Idle");
    }

    #[test]
    fn container_never_exceeds_capacity() {
        let mut model = model();
        poll(&mut model, reported(0.0, 812.0, "Idle"));
        assert_eq!(model.snapshot().state.container_weight_grams, 500);
    }
}
