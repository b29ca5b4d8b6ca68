// Dashboard controller - Single task owning subscriptions, snapshot state and commands
use crate::application::aggregator::SnapshotAggregator;
use crate::application::backend_api::{BackendApi, PlotImage};
use crate::application::command_gate::{CommandGate, Preconditions};
use crate::application::confirmation::Confirmation;
use crate::application::error::FetchError;
use crate::application::subscription::Subscription;
use crate::domain::command::{
    Command, CommandArtifact, CommandKind, CommandOutcome, PlotOutcome, Rejection, ReportOutcome,
};
use crate::domain::sample::{Sample, HISTORY_CAPACITY};
use crate::domain::snapshot::DashboardSnapshot;
use crate::domain::source::{SourceKey, SourcePayload};
use crate::domain::stats::StatsSnapshot;
use crate::domain::status::ModeInfo;
use crate::domain::view::View;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub stream_period: Duration,
    pub poll_timeout: Duration,
    pub compute_timeout: Duration,
    pub generate_timeout: Duration,
    /// Bound of reset, mode, plot and report requests.
    pub action_timeout: Duration,
    pub history_capacity: usize,
    pub auto_stream: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            stream_period: Duration::from_millis(200),
            poll_timeout: Duration::from_millis(2500),
            compute_timeout: Duration::from_millis(2000),
            generate_timeout: Duration::from_millis(3000),
            action_timeout: Duration::from_millis(3000),
            history_capacity: HISTORY_CAPACITY,
            auto_stream: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("dashboard controller has stopped")]
    Stopped,
}

/// What the primary (Enter key) action ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryAction {
    Refreshed,
    Computed(CommandOutcome),
    Idle,
}

enum Control {
    Mount(View, oneshot::Sender<()>),
    Unmount(oneshot::Sender<()>),
    SetStreaming(bool, oneshot::Sender<()>),
    Refresh(Vec<SourceKey>, oneshot::Sender<usize>),
    Dispatch(Command, oneshot::Sender<CommandOutcome>),
    OpenReset(oneshot::Sender<bool>),
    CancelReset(oneshot::Sender<bool>),
    ConfirmReset(oneshot::Sender<CommandOutcome>),
}

enum CommandResult {
    Stats(Result<StatsSnapshot, FetchError>),
    Data(Result<Sample, FetchError>),
    Mode(Result<ModeInfo, FetchError>),
    Plot(Result<PlotOutcome, FetchError>),
    Report(Result<ReportOutcome, FetchError>),
}

enum Completion {
    Poll {
        key: SourceKey,
        ticket: u64,
        result: Result<SourcePayload, FetchError>,
    },
    Command {
        kind: CommandKind,
        /// Reset epoch at dispatch time.
        epoch: u64,
        result: CommandResult,
        reply: oneshot::Sender<CommandOutcome>,
    },
    ResetAcknowledged {
        result: Result<(), FetchError>,
        reply: oneshot::Sender<CommandOutcome>,
    },
    ResetRefreshed {
        reset: Result<(), FetchError>,
        refresh: Result<StatsSnapshot, FetchError>,
        reply: oneshot::Sender<CommandOutcome>,
    },
}

/// Cloneable front of the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    control: mpsc::Sender<Control>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    api: BackendApi,
    action_timeout: Duration,
}

impl ControllerHandle {
    /// The latest published snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Control,
    ) -> Result<T, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.control
            .send(build(tx))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    /// Mount `view`, replacing any mounted one, and fetch each of its sources once.
    pub async fn mount(&self, view: View) -> Result<(), ControllerError> {
        self.request(|tx| Control::Mount(view, tx)).await
    }

    pub async fn unmount(&self) -> Result<(), ControllerError> {
        self.request(Control::Unmount).await
    }

    pub async fn set_streaming(&self, enabled: bool) -> Result<(), ControllerError> {
        self.request(|tx| Control::SetStreaming(enabled, tx)).await
    }

    /// Re-fetch the given mounted sources, or all of them when `keys` is
    /// empty. Returns how many requests were issued.
    pub async fn refresh(&self, keys: Vec<SourceKey>) -> Result<usize, ControllerError> {
        self.request(|tx| Control::Refresh(keys, tx)).await
    }

    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, ControllerError> {
        self.request(|tx| Control::Dispatch(command, tx)).await
    }

    /// Refresh once while paused, otherwise compute when enough samples exist.
    pub async fn primary_action(&self) -> Result<PrimaryAction, ControllerError> {
        let snapshot = self.snapshot();
        if !snapshot.auto_stream {
            self.refresh(Vec::new()).await?;
            return Ok(PrimaryAction::Refreshed);
        }
        if snapshot.is_enabled(CommandKind::ComputeStats) {
            let outcome = self.dispatch(Command::ComputeStats).await?;
            return Ok(PrimaryAction::Computed(outcome));
        }
        Ok(PrimaryAction::Idle)
    }

    pub async fn open_reset(&self) -> Result<bool, ControllerError> {
        self.request(Control::OpenReset).await
    }

    pub async fn cancel_reset(&self) -> Result<bool, ControllerError> {
        self.request(Control::CancelReset).await
    }

    /// Run the pending reset. Resolves once the reset and the statistics
    /// refresh after it have both settled.
    pub async fn confirm_reset(&self) -> Result<CommandOutcome, ControllerError> {
        self.request(Control::ConfirmReset).await
    }

    /// Read-only; does not go through the controller task.
    pub async fn plot_image(&self, plot_id: &str) -> Result<PlotImage, FetchError> {
        self.api.plot_image(plot_id, self.action_timeout).await
    }
}

pub struct Controller {
    api: BackendApi,
    settings: ControllerSettings,
    view: Option<View>,
    auto_stream: bool,
    subscriptions: BTreeMap<SourceKey, Subscription>,
    aggregator: SnapshotAggregator,
    gate: CommandGate,
    confirmation: Confirmation,
    ticker: Interval,
    next_ticket: u64,
    /// Bumped whenever the backend acknowledges a reset.
    reset_epoch: u64,
    revision: u64,
    control_rx: mpsc::Receiver<Control>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

impl Controller {
    /// Start the controller task. It runs until every handle is dropped.
    pub fn spawn(api: BackendApi, settings: ControllerSettings) -> (ControllerHandle, JoinHandle<()>) {
        let (control_tx, control_rx) = mpsc::channel(64);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());

        let period = settings.stream_period.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut controller = Controller {
            api: api.clone(),
            settings,
            view: None,
            auto_stream: settings.auto_stream,
            subscriptions: BTreeMap::new(),
            aggregator: SnapshotAggregator::new(settings.history_capacity),
            gate: CommandGate::new(),
            confirmation: Confirmation::new(),
            ticker,
            next_ticket: 0,
            reset_epoch: 0,
            revision: 0,
            control_rx,
            completion_tx,
            completion_rx,
            snapshot_tx,
        };
        controller.publish();

        let handle = ControllerHandle {
            control: control_tx,
            snapshots: snapshot_rx,
            api,
            action_timeout: settings.action_timeout,
        };
        (handle, tokio::spawn(controller.run()))
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                message = self.control_rx.recv() => match message {
                    Some(message) => self.handle_control(message),
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => self.handle_completion(completion),
                _ = self.ticker.tick(), if self.is_streaming() => self.tick(),
            }
            self.publish();
        }

        self.unmount();
        tracing::debug!("dashboard controller stopped");
    }

    fn is_streaming(&self) -> bool {
        self.auto_stream && self.subscriptions.values().any(Subscription::is_repeating)
    }

    fn handle_control(&mut self, message: Control) {
        match message {
            Control::Mount(view, ack) => {
                self.mount(view);
                self.respond(ack, ());
            }
            Control::Unmount(ack) => {
                self.unmount();
                self.respond(ack, ());
            }
            Control::SetStreaming(enabled, ack) => {
                self.set_streaming(enabled);
                self.respond(ack, ());
            }
            Control::Refresh(keys, ack) => {
                let issued = self.refresh(&keys);
                self.respond(ack, issued);
            }
            Control::Dispatch(command, reply) => self.dispatch(command, reply),
            Control::OpenReset(reply) => {
                let opened = self.confirmation.open();
                self.respond(reply, opened);
            }
            Control::CancelReset(reply) => {
                let cancelled = self.confirmation.cancel();
                self.respond(reply, cancelled);
            }
            Control::ConfirmReset(reply) => self.confirm_reset(reply),
        }
    }

    /// Publish first so a caller woken by the reply already sees its effect.
    fn respond<T>(&mut self, reply: oneshot::Sender<T>, value: T) {
        self.publish();
        let _ = reply.send(value);
    }

    fn mount(&mut self, view: View) {
        self.unmount();

        let table = view.subscriptions();
        for (key, cadence) in &table {
            self.subscriptions.insert(
                *key,
                Subscription::new(*key, *cadence, self.settings.poll_timeout),
            );
        }
        self.view = Some(view);
        tracing::info!(?view, sources = table.len(), "view mounted");

        for (key, _) in table {
            self.issue(key);
        }
        self.ticker.reset();
    }

    fn unmount(&mut self) {
        let keys: Vec<SourceKey> = self.subscriptions.keys().copied().collect();
        for key in keys {
            self.cancel(key);
        }
        self.subscriptions.clear();

        if let Some(view) = self.view.take() {
            tracing::info!(?view, "view unmounted");
        }
    }

    fn set_streaming(&mut self, enabled: bool) {
        if self.auto_stream == enabled {
            return;
        }
        self.auto_stream = enabled;
        tracing::info!(enabled, "auto-stream toggled");

        let repeating: Vec<SourceKey> = self
            .subscriptions
            .values()
            .filter(|s| s.is_repeating())
            .map(Subscription::key)
            .collect();

        if enabled {
            for key in repeating {
                self.issue(key);
            }
            self.ticker.reset();
        } else {
            for key in repeating {
                self.cancel(key);
            }
        }
    }

    fn refresh(&mut self, keys: &[SourceKey]) -> usize {
        let targets: Vec<SourceKey> = self
            .subscriptions
            .keys()
            .copied()
            .filter(|key| keys.is_empty() || keys.contains(key))
            .collect();

        targets.into_iter().filter(|key| self.issue(*key)).count()
    }

    fn tick(&mut self) {
        let repeating: Vec<SourceKey> = self
            .subscriptions
            .values()
            .filter(|s| s.is_repeating())
            .map(Subscription::key)
            .collect();

        for key in repeating {
            self.issue(key);
        }
    }

    /// Start one fetch of `key` unless its previous one is still outstanding.
    fn issue(&mut self, key: SourceKey) -> bool {
        let Some(subscription) = self.subscriptions.get_mut(&key) else {
            return false;
        };
        if subscription.is_in_flight() {
            tracing::debug!(source = %key, "previous request still in flight, skipping");
            return false;
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let bound = subscription.timeout();
        let api = self.api.clone();
        let completions = self.completion_tx.clone();

        let task = tokio::spawn(async move {
            let result = api.poll(key, bound).await;
            let _ = completions.send(Completion::Poll { key, ticket, result });
        });
        subscription.track(ticket, task.abort_handle());
        true
    }

    fn cancel(&mut self, key: SourceKey) {
        if let Some(subscription) = self.subscriptions.get_mut(&key) {
            if subscription.cancel() {
                tracing::debug!(source = %key, "in-flight request cancelled");
            }
        }
    }

    fn preconditions(&self) -> Preconditions<'_> {
        Preconditions {
            stats: self.aggregator.stats(),
            mode: self.aggregator.mode().map(|m| m.mode),
        }
    }

    fn dispatch(&mut self, command: Command, reply: oneshot::Sender<CommandOutcome>) {
        let kind = command.kind();
        let admitted = self.gate.admit(&command, &self.preconditions());
        if let Err(rejection) = admitted {
            tracing::info!(command = %kind, %rejection, "command not dispatched");
            self.gate.reject(kind, &rejection);
            self.respond(reply, CommandOutcome::rejected(rejection));
            return;
        }

        let stats = self.aggregator.stats().cloned().unwrap_or_default();
        let plot_id = self.gate.last_plot_id();
        let epoch = self.reset_epoch;
        let settings = self.settings;
        let api = self.api.clone();
        let completions = self.completion_tx.clone();

        self.gate.begin(kind);
        tokio::spawn(async move {
            let result = match command {
                Command::ComputeStats => CommandResult::Stats(api.stats(settings.compute_timeout).await),
                Command::GenerateData => CommandResult::Data(api.generate(settings.generate_timeout).await),
                Command::UpdateMode(mode) => {
                    CommandResult::Mode(api.set_mode(mode, settings.action_timeout).await)
                }
                Command::GeneratePlot => {
                    CommandResult::Plot(api.create_plot(&stats, settings.action_timeout).await)
                }
                Command::GenerateReport => CommandResult::Report(
                    api.create_report(&stats, plot_id.as_deref(), settings.action_timeout)
                        .await,
                ),
            };
            let _ = completions.send(Completion::Command {
                kind,
                epoch,
                result,
                reply,
            });
        });
    }

    fn confirm_reset(&mut self, reply: oneshot::Sender<CommandOutcome>) {
        if !self.confirmation.confirm() {
            self.respond(reply, CommandOutcome::rejected(Rejection::NoConfirmationOpen));
            return;
        }

        self.gate.begin(CommandKind::Reset);
        let api = self.api.clone();
        let bound = self.settings.action_timeout;
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = api.reset(bound).await;
            let _ = completions.send(Completion::ResetAcknowledged { result, reply });
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Poll { key, ticket, result } => {
                let accepted = self
                    .subscriptions
                    .get_mut(&key)
                    .map(|s| s.complete(ticket))
                    .unwrap_or(false);
                if accepted {
                    self.aggregator.apply(key, result);
                } else {
                    tracing::debug!(source = %key, ticket, "discarding result of cancelled request");
                }
            }
            Completion::Command {
                kind,
                epoch,
                result,
                reply,
            } => self.finish_command(kind, epoch, result, reply),
            Completion::ResetAcknowledged { result, reply } => self.after_reset(result, reply),
            Completion::ResetRefreshed {
                reset,
                refresh,
                reply,
            } => self.finish_reset(reset, refresh, reply),
        }
    }

    fn finish_command(
        &mut self,
        kind: CommandKind,
        epoch: u64,
        result: CommandResult,
        reply: oneshot::Sender<CommandOutcome>,
    ) {
        // Window values read before a reset must not repopulate the cleared window.
        let window_current = epoch == self.reset_epoch;
        let outcome = match result {
            CommandResult::Stats(Ok(stats)) => {
                if window_current {
                    self.aggregator.apply(SourceKey::Stats, Ok(SourcePayload::Stats(stats)));
                } else {
                    tracing::debug!(command = %kind, "dropping statistics read before reset");
                }
                CommandOutcome::completed()
            }
            CommandResult::Data(Ok(sample)) => {
                if window_current {
                    self.aggregator.apply(SourceKey::Data, Ok(SourcePayload::Data(sample)));
                } else {
                    tracing::debug!(command = %kind, "dropping sample read before reset");
                }
                CommandOutcome::completed()
            }
            CommandResult::Mode(Ok(info)) => {
                let message = Some(info.message.clone()).filter(|m| !m.is_empty());
                self.aggregator.apply(SourceKey::Mode, Ok(SourcePayload::Mode(info)));
                CommandOutcome::Completed { message }
            }
            CommandResult::Plot(Ok(PlotOutcome::Created { plot_id, message })) => {
                self.gate.set_artifact(kind, CommandArtifact::Plot { plot_id });
                CommandOutcome::Completed { message }
            }
            CommandResult::Report(Ok(ReportOutcome::Compiled { report, message })) => {
                self.gate.set_artifact(kind, CommandArtifact::Report { report });
                CommandOutcome::Completed { message }
            }
            CommandResult::Plot(Ok(PlotOutcome::Skipped { message }))
            | CommandResult::Report(Ok(ReportOutcome::Skipped { message })) => {
                CommandOutcome::Skipped { message }
            }
            CommandResult::Stats(Err(err))
            | CommandResult::Data(Err(err))
            | CommandResult::Mode(Err(err))
            | CommandResult::Plot(Err(err))
            | CommandResult::Report(Err(err)) => {
                tracing::warn!(command = %kind, error = %err, "command failed");
                CommandOutcome::Failed {
                    message: err.user_message(),
                }
            }
        };

        tracing::info!(command = %kind, ?outcome, "command settled");
        self.gate.settle(kind, &outcome);
        self.respond(reply, outcome);
    }

    fn after_reset(&mut self, result: Result<(), FetchError>, reply: oneshot::Sender<CommandOutcome>) {
        if result.is_ok() {
            // Polls issued before the reset would restore pre-reset numbers.
            self.cancel(SourceKey::Stats);
            self.cancel(SourceKey::Data);
            self.reset_epoch += 1;
            self.aggregator.clear_window();
            tracing::info!("rolling window cleared");
        }

        let api = self.api.clone();
        let bound = self.settings.poll_timeout;
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let refresh = api.stats(bound).await;
            let _ = completions.send(Completion::ResetRefreshed {
                reset: result,
                refresh,
                reply,
            });
        });
    }

    fn finish_reset(
        &mut self,
        reset: Result<(), FetchError>,
        refresh: Result<StatsSnapshot, FetchError>,
        reply: oneshot::Sender<CommandOutcome>,
    ) {
        self.aggregator
            .apply(SourceKey::Stats, refresh.map(SourcePayload::Stats));

        let outcome = match reset {
            Ok(()) => CommandOutcome::Completed {
                message: Some("Rolling statistics cleared.".to_string()),
            },
            Err(err) => {
                tracing::warn!(error = %err, "reset failed");
                CommandOutcome::Failed {
                    message: err.user_message(),
                }
            }
        };

        self.gate.settle(CommandKind::Reset, &outcome);
        self.confirmation.settle();
        self.respond(reply, outcome);
    }

    fn publish(&mut self) {
        self.revision += 1;
        let mut snapshot = DashboardSnapshot {
            revision: self.revision,
            view: self.view,
            auto_stream: self.auto_stream,
            reset_confirmation: self.confirmation.state(),
            ..Default::default()
        };
        self.aggregator.fill(&mut snapshot);
        for (key, subscription) in &self.subscriptions {
            snapshot.sources.entry(*key).or_default().in_flight = subscription.is_in_flight();
        }
        self.gate.fill(&mut snapshot, &self.preconditions());
        self.snapshot_tx.send_replace(snapshot);
    }
}
