// ── Controller ──
//
// Lifecycle management for one device service: owns the state actor, the
// status poller bound to the configured device, and the command processor.
// Consumers observe state through `watch`/`broadcast` channels and submit
// mutations through `execute()`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use autofeed_api::{DeviceServiceClient, DeviceStatus, FeedEvent, Schedule, ServiceHealth};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{CommandId, CommandKind, DeviceEvent, DeviceSnapshot, DeviceState, DisplayStatus};
use crate::schedule::ScheduleManager;
use crate::settings::{DeviceSettings, SettingsProvider, SettingsStore};
use crate::state::{DeviceModel, PollOutcome, StateEnvelope, StateUpdate, state_actor_task};

/// Weekly per-day totals, oldest day first.
pub use autofeed_api::WeeklyAnalytics as WeeklyTotals;

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 64;

// ── Lifecycle ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// The device the poller and dispatcher currently act on.
///
/// `scope` increases on every rebind so late results from an older
/// binding can be recognised and dropped.
#[derive(Debug)]
struct Binding {
    scope: u64,
    device_id: String,
}

struct PollerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    api: DeviceServiceClient,
    settings: SettingsProvider,
    schedules: ScheduleManager,
    binding: ArcSwap<Binding>,
    lifecycle: watch::Sender<Lifecycle>,
    snapshot_tx: watch::Sender<DeviceSnapshot>,
    event_tx: broadcast::Sender<DeviceEvent>,
    state_tx: mpsc::UnboundedSender<StateEnvelope>,
    state_rx: Mutex<Option<mpsc::UnboundedReceiver<StateEnvelope>>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    poller: Mutex<Option<PollerHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller. Builds the HTTP client but spawns nothing;
    /// call [`start()`](Self::start) to begin polling.
    pub fn new(config: ControllerConfig, store: Arc<dyn SettingsStore>) -> Result<Self, CoreError> {
        let api = DeviceServiceClient::new(config.service_url.clone(), &config.transport())?;
        let settings = SettingsProvider::new(store);
        let schedules = ScheduleManager::new(api.clone(), settings.clone());

        let initial = DeviceSnapshot {
            state: DeviceState::new("", config.container_capacity),
            command: None,
            display: DisplayStatus::default(),
            low_food_alert_fired: false,
        };
        let (snapshot_tx, _) = watch::channel(initial);
        let (lifecycle, _) = watch::channel(Lifecycle::Created);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                settings,
                schedules,
                binding: ArcSwap::from_pointee(Binding {
                    scope: 0,
                    device_id: String::new(),
                }),
                lifecycle,
                snapshot_tx,
                event_tx,
                state_tx,
                state_rx: Mutex::new(Some(state_rx)),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                poller: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load settings, spawn the state actor and command processor, and
    /// bind the configured device (starting its poller).
    pub async fn start(&self) -> Result<(), CoreError> {
        match self.lifecycle() {
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => return Err(CoreError::ControllerStopped),
            Lifecycle::Created => {}
        }

        let settings = self.inner.settings.get().await?;

        let state_rx = self.inner.state_rx.lock().await.take();
        let command_rx = self.inner.command_rx.lock().await.take();
        let (Some(state_rx), Some(command_rx)) = (state_rx, command_rx) else {
            return Err(CoreError::Internal("controller already started".into()));
        };

        {
            let mut handles = self.inner.task_handles.lock().await;
            handles.push(tokio::spawn(state_actor_task(
                self.clone(),
                DeviceModel::new(&self.inner.config),
                state_rx,
                self.inner.cancel.child_token(),
            )));
            handles.push(tokio::spawn(command_processor_task(
                self.clone(),
                command_rx,
                self.inner.cancel.child_token(),
            )));
        }
        self.inner.lifecycle.send_replace(Lifecycle::Running);

        self.bind(settings.device_id).await?;
        info!(service = %self.inner.config.service_url, "controller started");
        Ok(())
    }

    /// Persist new settings and re-bind the poller to the new device.
    ///
    /// The old poll task is cancelled and joined before the new one is
    /// spawned; its first fetch happens immediately.
    pub async fn configure(&self, device_id: &str, camera_ip: &str) -> Result<DeviceSettings, CoreError> {
        self.ensure_running()?;
        let settings = self.inner.settings.set(device_id, camera_ip).await?;
        self.bind(settings.device_id.clone()).await?;
        Ok(settings)
    }

    /// Cancel every background task and wait for them to finish.
    pub async fn shutdown(&self) {
        if self.inner.lifecycle.send_replace(Lifecycle::Stopped) == Lifecycle::Stopped {
            return;
        }
        self.inner.cancel.cancel();

        if let Some(poller) = self.inner.poller.lock().await.take() {
            let _ = poller.handle.await;
        }
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!("controller stopped");
    }

    /// One-shot: start without a poller, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(
        config: ControllerConfig,
        store: Arc<dyn SettingsStore>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg, store)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    async fn bind(&self, device_id: String) -> Result<DeviceSnapshot, CoreError> {
        let mut poller = self.inner.poller.lock().await;
        if let Some(old) = poller.take() {
            old.cancel.cancel();
            let _ = old.handle.await;
        }

        let scope = self.inner.binding.load().scope + 1;
        let binding = Arc::new(Binding { scope, device_id });
        self.inner.binding.store(Arc::clone(&binding));
        let snapshot = self
            .apply(StateUpdate::Rebind {
                scope,
                device_id: binding.device_id.clone(),
            })
            .await?;

        let period = self.inner.config.poll_interval;
        if binding.device_id.is_empty() {
            debug!("no device configured, status poller idle");
        } else if period.is_zero() {
            debug!(device_id = %binding.device_id, "status polling disabled");
        } else {
            let cancel = self.inner.cancel.child_token();
            let handle = tokio::spawn(poll_task(
                self.clone(),
                Arc::clone(&binding),
                period,
                cancel.clone(),
            ));
            *poller = Some(PollerHandle { cancel, handle });
            info!(device_id = %binding.device_id, ?period, "status poller started");
        }
        Ok(snapshot)
    }

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.lifecycle() == Lifecycle::Running {
            Ok(())
        } else {
            Err(CoreError::ControllerStopped)
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        self.ensure_running()?;

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Run one poll tick now and return the resulting snapshot.
    ///
    /// A failed fetch still marks the device offline before the error is
    /// returned.
    pub async fn refresh_status(&self) -> Result<DeviceSnapshot, CoreError> {
        self.ensure_running()?;
        let binding = self.bound_device()?;

        match self.inner.api.device_status(&binding.device_id).await {
            Ok(status) => {
                self.apply(StateUpdate::Poll {
                    scope: binding.scope,
                    outcome: PollOutcome::Reported(status),
                })
                .await
            }
            Err(e) => {
                self.apply(StateUpdate::Poll {
                    scope: binding.scope,
                    outcome: PollOutcome::Unreachable,
                })
                .await?;
                Err(e.into())
            }
        }
    }

    // ── Ad-hoc reads ─────────────────────────────────────────────

    /// Current persisted settings.
    pub async fn settings(&self) -> Result<DeviceSettings, CoreError> {
        self.inner.settings.get().await
    }

    /// Re-fetch the schedule list, updating the cache on success.
    pub async fn list_schedules(&self) -> Result<Arc<Vec<Schedule>>, CoreError> {
        self.inner.schedules.list().await
    }

    pub async fn history(&self) -> Result<Vec<FeedEvent>, CoreError> {
        Ok(self.inner.api.history().await?)
    }

    pub async fn weekly_analytics(&self) -> Result<WeeklyTotals, CoreError> {
        Ok(self.inner.api.weekly_analytics().await?)
    }

    pub async fn service_health(&self) -> Result<ServiceHealth, CoreError> {
        Ok(self.inner.api.health().await?)
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Snapshot changes as a `Stream`, starting with the current value.
    pub fn snapshots(&self) -> WatchStream<DeviceSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Subscribe to low-food and connectivity events.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn schedules_snapshot(&self) -> Arc<Vec<Schedule>> {
        self.inner.schedules.snapshot()
    }

    // ── State actor plumbing ─────────────────────────────────────

    /// Send an update and wait until the actor has applied it.
    async fn apply(&self, update: StateUpdate) -> Result<DeviceSnapshot, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .state_tx
            .send(StateEnvelope {
                update,
                ack: Some(tx),
            })
            .map_err(|_| CoreError::ControllerStopped)?;
        rx.await.map_err(|_| CoreError::ControllerStopped)
    }

    /// Fire-and-forget variant of [`apply`](Self::apply).
    fn notify(&self, update: StateUpdate) {
        if self
            .inner
            .state_tx
            .send(StateEnvelope { update, ack: None })
            .is_err()
        {
            debug!("state actor gone, update dropped");
        }
    }

    pub(crate) fn publish(&self, next: &DeviceSnapshot, events: Vec<DeviceEvent>) {
        self.inner.snapshot_tx.send_if_modified(|current| {
            if current == next {
                false
            } else {
                current.clone_from(next);
                true
            }
        });
        for event in events {
            let _ = self.inner.event_tx.send(event);
        }
    }

    fn bound_device(&self) -> Result<Arc<Binding>, CoreError> {
        let binding = self.inner.binding.load_full();
        if binding.device_id.is_empty() {
            return Err(CoreError::DeviceNotConfigured);
        }
        Ok(binding)
    }

    /// Revert the optimistic or error status of command `id` once the window closes.
    async fn spawn_window_timer(&self, id: CommandId) {
        let window = self.inner.config.optimistic_window;
        let cancel = self.inner.cancel.child_token();
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    controller.notify(StateUpdate::WindowElapsed { id });
                }
            }
        });

        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Fetch the bound device's status every `period`, starting immediately.
async fn poll_task(
    controller: Controller,
    binding: Arc<Binding>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = controller.inner.api.device_status(&binding.device_id) => result,
                };
                controller.notify(StateUpdate::Poll {
                    scope: binding.scope,
                    outcome: poll_outcome(&binding.device_id, result),
                });
            }
        }
    }
    debug!(device_id = %binding.device_id, "status poller stopped");
}

fn poll_outcome(device_id: &str, result: Result<DeviceStatus, autofeed_api::Error>) -> PollOutcome {
    match result {
        Ok(status) => PollOutcome::Reported(status),
        Err(e) => {
            debug!(device_id, error = %e, "status poll failed");
            PollOutcome::Unreachable
        }
    }
}

/// Process commands from the mpsc channel, one at a time.
async fn command_processor_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    match cmd {
        Command::Feed { amount_grams } => {
            dispatch_dispense(controller, CommandKind::Feed, amount_grams).await
        }
        Command::DispenseWater { amount_ml } => {
            dispatch_dispense(controller, CommandKind::DispenseWater, amount_ml).await
        }
        Command::Refill => dispatch_refill(controller).await,
        Command::CreateSchedule { time, amount_grams } => {
            let created = controller.inner.schedules.create(&time, amount_grams).await?;
            Ok(CommandResult::ScheduleCreated(created))
        }
        Command::DeleteSchedule { id } => {
            controller.inner.schedules.remove(&id).await?;
            Ok(CommandResult::ScheduleDeleted)
        }
    }
}

async fn dispatch_dispense(
    controller: &Controller,
    kind: CommandKind,
    amount: u32,
) -> Result<CommandResult, CoreError> {
    let binding = controller.bound_device()?;
    if amount == 0 {
        return Err(CoreError::validation("Amount must be greater than zero"));
    }

    let id = CommandId::new();
    controller
        .apply(StateUpdate::CommandRequested {
            scope: binding.scope,
            id,
            kind,
            amount: Some(amount),
        })
        .await?;
    info!(device_id = %binding.device_id, command = %kind, amount, "dispatching command");

    let api = &controller.inner.api;
    let sent = if kind == CommandKind::DispenseWater {
        api.dispense_water(&binding.device_id, amount).await
    } else {
        api.feed(&binding.device_id, amount).await
    };

    match sent {
        Ok(ack) => {
            controller.apply(StateUpdate::CommandAccepted { id }).await?;
            controller.spawn_window_timer(id).await;
            Ok(CommandResult::Accepted {
                id,
                message: ack.message,
            })
        }
        Err(e) => Err(command_failed(controller, id, kind, e).await),
    }
}

async fn dispatch_refill(controller: &Controller) -> Result<CommandResult, CoreError> {
    let binding = controller.bound_device()?;

    let id = CommandId::new();
    controller
        .apply(StateUpdate::CommandRequested {
            scope: binding.scope,
            id,
            kind: CommandKind::Refill,
            amount: None,
        })
        .await?;
    info!(device_id = %binding.device_id, "dispatching refill");

    match controller.inner.api.refill(&binding.device_id).await {
        Ok(resp) => {
            let snapshot = controller
                .apply(StateUpdate::Refilled {
                    scope: binding.scope,
                    id,
                    container_weight: resp.container_weight,
                })
                .await?;
            Ok(CommandResult::Refilled {
                container_weight_grams: snapshot.state.container_weight_grams,
                message: resp.message,
            })
        }
        Err(e) => Err(command_failed(controller, id, CommandKind::Refill, e).await),
    }
}

/// Record the failure with the state actor. Feed and water show the error
/// marker for one optimistic window before falling back to idle.
async fn command_failed(
    controller: &Controller,
    id: CommandId,
    kind: CommandKind,
    err: autofeed_api::Error,
) -> CoreError {
    let err = CoreError::from(err);
    warn!(command = %kind, error = %err, "command failed");
    controller.notify(StateUpdate::CommandFailed {
        id,
        reason: err.to_string(),
    });
    if kind != CommandKind::Refill {
        controller.spawn_window_timer(id).await;
    }
    err
}
