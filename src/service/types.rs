use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one managed OS service.
///
/// Built once from configuration at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Internal service name, the unique key used with the OS service registry.
    pub name: String,
    /// Human-readable name registered alongside the service.
    pub display_name: String,
    /// Free-form description shown to operators.
    pub description: String,
    /// Executable (with arguments) the OS launches for this service.
    pub executable: String,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            executable: executable.into(),
        }
    }
}

/// Live status of a service as reported by the OS.
///
/// Never persisted. There are deliberately no `Installing`/`Starting` values:
/// an operation in progress is tracked by the controller's busy flag instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    NotInstalled,
    Stopped,
    Running,
}

impl ServiceStatus {
    /// Derive a status from the two probe answers.
    pub fn from_probe(exists: bool, running: bool) -> Self {
        match (exists, running) {
            (false, _) => ServiceStatus::NotInstalled,
            (true, true) => ServiceStatus::Running,
            (true, false) => ServiceStatus::Stopped,
        }
    }

    pub fn is_installed(&self) -> bool {
        !matches!(self, ServiceStatus::NotInstalled)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::NotInstalled => write!(f, "not installed"),
            ServiceStatus::Stopped => write!(f, "stopped"),
            ServiceStatus::Running => write!(f, "running"),
        }
    }
}

/// One of the five lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleOp {
    Install,
    Uninstall,
    Start,
    Stop,
    Restart,
}

impl LifecycleOp {
    pub const ALL: [LifecycleOp; 5] = [
        LifecycleOp::Install,
        LifecycleOp::Uninstall,
        LifecycleOp::Start,
        LifecycleOp::Stop,
        LifecycleOp::Restart,
    ];

    /// Whether the operation makes sense for a service in `status`.
    ///
    /// Mirrors which controls an operator should see enabled. The controller
    /// itself still accepts every operation and answers with a precondition
    /// outcome when it does not apply.
    pub fn is_available(&self, status: ServiceStatus) -> bool {
        use LifecycleOp::*;
        use ServiceStatus::*;
        match (self, status) {
            (Install, NotInstalled) => true,
            (Uninstall, Stopped) => true,
            (Start, Stopped) => true,
            (Stop, Running) => true,
            (Restart, Running) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleOp::Install => "install",
            LifecycleOp::Uninstall => "uninstall",
            LifecycleOp::Start => "start",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Restart => "restart",
        };
        f.write_str(s)
    }
}

/// Why a lifecycle operation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// The external command ran and exited with code 0.
    Completed,
    /// `start` on a running service; nothing was executed.
    AlreadyRunning,
    /// `stop` on a service that is not running; nothing was executed.
    NotRunning,
    AlreadyInstalled,
    NotInstalled,
    /// `uninstall` refused because the service is running.
    StillRunning,
    /// Another operation for the same service is in flight.
    Busy,
    /// The external command ran but exited non-zero (or was killed by a signal).
    CommandFailed { exit_code: Option<i32> },
    /// The external command could not be launched at all.
    LaunchFailed,
    /// The external command did not finish within the command timeout.
    TimedOut,
    /// The operation was interrupted by orchestrator shutdown.
    Cancelled,
    /// No service with the requested name is configured.
    UnknownService,
}

/// Coarse error taxonomy used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Launch,
    Command,
    Precondition,
    Busy,
    Cancelled,
}

impl Outcome {
    /// Whether this outcome counts as success for the caller.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Completed | Outcome::AlreadyRunning | Outcome::NotRunning
        )
    }

    /// Failure category, `None` for successful outcomes.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Completed | Outcome::AlreadyRunning | Outcome::NotRunning => None,
            Outcome::AlreadyInstalled
            | Outcome::NotInstalled
            | Outcome::StillRunning
            | Outcome::UnknownService => Some(FailureKind::Precondition),
            Outcome::Busy => Some(FailureKind::Busy),
            Outcome::CommandFailed { .. } | Outcome::TimedOut => Some(FailureKind::Command),
            Outcome::LaunchFailed => Some(FailureKind::Launch),
            Outcome::Cancelled => Some(FailureKind::Cancelled),
        }
    }
}

/// Result of a lifecycle operation, shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub message: String,
}

impl LifecycleResult {
    pub fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            success: outcome.is_success(),
            outcome,
            message: message.into(),
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self::new(Outcome::Completed, message)
    }

    pub fn busy(service: &str, op: LifecycleOp) -> Self {
        Self::new(
            Outcome::Busy,
            format!(
                "Cannot {} '{}': another operation on this service is still in progress",
                op, service
            ),
        )
    }

    pub fn not_installed(service: &str) -> Self {
        Self::new(
            Outcome::NotInstalled,
            format!("Service '{}' is not installed; install it first", service),
        )
    }

    pub fn unknown_service(service: &str) -> Self {
        Self::new(
            Outcome::UnknownService,
            format!("No service named '{}' is configured", service),
        )
    }

    pub fn cancelled(service: &str, op: LifecycleOp) -> Self {
        Self::new(
            Outcome::Cancelled,
            format!("{} of '{}' was cancelled by shutdown", capitalize(op), service),
        )
    }
}

impl fmt::Display for LifecycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A status change observed by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub service: String,
    /// `None` on the first observation of a service.
    pub previous: Option<ServiceStatus>,
    pub current: ServiceStatus,
}

fn capitalize(op: LifecycleOp) -> String {
    let s = op.to_string();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}
