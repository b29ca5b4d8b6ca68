// Command domain models - Guarded operator actions and their outcomes
use super::status::Mode;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    ComputeStats,
    GenerateData,
    Reset,
    UpdateMode,
    GeneratePlot,
    GenerateReport,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        CommandKind::ComputeStats,
        CommandKind::GenerateData,
        CommandKind::Reset,
        CommandKind::UpdateMode,
        CommandKind::GeneratePlot,
        CommandKind::GenerateReport,
    ];

    /// Actions that stay disabled until the stats window holds enough samples.
    pub fn requires_samples(&self) -> bool {
        matches!(self, CommandKind::ComputeStats | CommandKind::GeneratePlot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::ComputeStats => "compute-stats",
            CommandKind::GenerateData => "generate-data",
            CommandKind::Reset => "reset",
            CommandKind::UpdateMode => "update-mode",
            CommandKind::GeneratePlot => "generate-plot",
            CommandKind::GenerateReport => "generate-report",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action the operator can dispatch directly.
///
/// Reset is absent on purpose: it is only reachable through the
/// confirmation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ComputeStats,
    GenerateData,
    UpdateMode(Mode),
    GeneratePlot,
    GenerateReport,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ComputeStats => CommandKind::ComputeStats,
            Command::GenerateData => CommandKind::GenerateData,
            Command::UpdateMode(_) => CommandKind::UpdateMode,
            Command::GeneratePlot => CommandKind::GeneratePlot,
            Command::GenerateReport => CommandKind::GenerateReport,
        }
    }
}

/// Why a command was not dispatched. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    InFlight,
    BelowThreshold { count: u64, required: u64 },
    NothingToCompile,
    Unchanged { mode: Mode },
    NoConfirmationOpen,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InFlight => write!(f, "Already in progress."),
            Rejection::BelowThreshold { count, required } => {
                write!(f, "Requires at least {} samples ({} buffered).", required, count)
            }
            Rejection::NothingToCompile => write!(f, "Nothing to compile yet: no statistics available."),
            Rejection::Unchanged { mode } => write!(f, "Mode is already {}.", mode),
            Rejection::NoConfirmationOpen => write!(f, "No reset is awaiting confirmation."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Completed { message: Option<String> },
    /// The backend deliberately did not perform the action.
    Skipped { message: String },
    Rejected { rejection: Rejection },
    Failed { message: String },
}

impl CommandOutcome {
    pub fn completed() -> Self {
        CommandOutcome::Completed { message: None }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        CommandOutcome::Rejected { rejection }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CommandOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlotOutcome {
    Created { plot_id: String, message: Option<String> },
    Skipped { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Compiled { report: serde_json::Value, message: Option<String> },
    Skipped { message: String },
}

/// Last success product of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandArtifact {
    Plot { plot_id: String },
    Report { report: serde_json::Value },
}

/// Per-command bookkeeping surfaced next to each control.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CommandState {
    pub in_flight: bool,
    /// Retryable failure of the last attempt.
    pub last_error: Option<String>,
    /// Informational message: skipped outcomes and rejections.
    pub notice: Option<String>,
    pub artifact: Option<CommandArtifact>,
}
