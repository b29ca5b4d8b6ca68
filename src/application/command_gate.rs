// Command gate - Preconditions and in-flight bookkeeping for operator actions
use crate::domain::command::{Command, CommandArtifact, CommandKind, CommandOutcome, CommandState, Rejection};
use crate::domain::snapshot::DashboardSnapshot;
use crate::domain::stats::{sample_count, StatsSnapshot, SAMPLE_THRESHOLD};
use crate::domain::status::Mode;
use std::collections::BTreeMap;

/// State a command's preconditions are checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preconditions<'a> {
    pub stats: Option<&'a StatsSnapshot>,
    pub mode: Option<Mode>,
}

#[derive(Debug)]
pub struct CommandGate {
    states: BTreeMap<CommandKind, CommandState>,
}

impl CommandGate {
    pub fn new() -> Self {
        let states = CommandKind::ALL
            .into_iter()
            .map(|kind| (kind, CommandState::default()))
            .collect();
        Self { states }
    }

    pub fn state(&self, kind: CommandKind) -> &CommandState {
        &self.states[&kind]
    }

    fn state_mut(&mut self, kind: CommandKind) -> &mut CommandState {
        self.states.entry(kind).or_default()
    }

    pub fn is_in_flight(&self, kind: CommandKind) -> bool {
        self.state(kind).in_flight
    }

    /// Checks that hold for a kind regardless of its arguments: no
    /// re-entry, the sample threshold, and the report's need for statistics.
    pub fn availability(&self, kind: CommandKind, ctx: &Preconditions<'_>) -> Result<(), Rejection> {
        if self.is_in_flight(kind) {
            return Err(Rejection::InFlight);
        }

        if kind.requires_samples() && !ctx.stats.is_some_and(StatsSnapshot::meets_threshold) {
            return Err(Rejection::BelowThreshold {
                count: sample_count(ctx.stats),
                required: SAMPLE_THRESHOLD,
            });
        }

        if kind == CommandKind::GenerateReport && ctx.stats.is_none() {
            return Err(Rejection::NothingToCompile);
        }

        Ok(())
    }

    pub fn admit(&self, command: &Command, ctx: &Preconditions<'_>) -> Result<(), Rejection> {
        self.availability(command.kind(), ctx)?;

        if let Command::UpdateMode(requested) = command {
            if ctx.mode == Some(*requested) {
                return Err(Rejection::Unchanged { mode: *requested });
            }
        }

        Ok(())
    }

    /// Mark `kind` in flight. Clears the messages of the previous attempt.
    pub fn begin(&mut self, kind: CommandKind) {
        let state = self.state_mut(kind);
        state.in_flight = true;
        state.last_error = None;
        state.notice = None;
    }

    pub fn reject(&mut self, kind: CommandKind, rejection: &Rejection) {
        let state = self.state_mut(kind);
        state.notice = Some(rejection.to_string());
    }

    /// Record how `kind` finished. Always clears the in-flight flag.
    pub fn settle(&mut self, kind: CommandKind, outcome: &CommandOutcome) {
        let state = self.state_mut(kind);
        state.in_flight = false;
        match outcome {
            CommandOutcome::Completed { message } => state.notice = message.clone(),
            CommandOutcome::Skipped { message } => state.notice = Some(message.clone()),
            CommandOutcome::Rejected { rejection } => state.notice = Some(rejection.to_string()),
            CommandOutcome::Failed { message } => state.last_error = Some(message.clone()),
        }
    }

    pub fn set_artifact(&mut self, kind: CommandKind, artifact: CommandArtifact) {
        self.state_mut(kind).artifact = Some(artifact);
    }

    pub fn last_plot_id(&self) -> Option<String> {
        match &self.state(CommandKind::GeneratePlot).artifact {
            Some(CommandArtifact::Plot { plot_id }) => Some(plot_id.clone()),
            _ => None,
        }
    }

    pub fn fill(&self, snapshot: &mut DashboardSnapshot, ctx: &Preconditions<'_>) {
        snapshot.commands = self.states.clone();
        snapshot.enabled = CommandKind::ALL
            .into_iter()
            .map(|kind| (kind, self.availability(kind, ctx).is_ok()))
            .collect();
    }
}

impl Default for CommandGate {
    fn default() -> Self {
        Self::new()
    }
}
