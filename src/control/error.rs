use std::fmt;
use std::time::Duration;

/// Failure to *run* a control command.
///
/// A command that ran and exited non-zero is not an error at this layer;
/// the runner reports it as a failed [`LifecycleResult`](crate::service::LifecycleResult).
/// These variants cover the cases where no exit code exists at all.
#[derive(Debug)]
pub enum CommandError {
    /// The binary couldn't be executed (not in PATH, permission denied, elevation refused).
    Launch {
        command: String,
        source: std::io::Error,
    },

    /// The command was killed after exceeding the command timeout.
    Timeout { command: String, timeout: Duration },
}

impl CommandError {
    pub fn launch(cmd: impl Into<String>, err: std::io::Error) -> Self {
        CommandError::Launch {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        CommandError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// The rendered command line this error refers to.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Launch { command, .. } | CommandError::Timeout { command, .. } => {
                command
            }
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Launch { command, source } => {
                write!(f, "Failed to launch '{}': {}", command, source)
            }
            CommandError::Timeout { command, timeout } => {
                write!(
                    f,
                    "Timed out running '{}' (exceeded {} seconds)",
                    command,
                    timeout.as_secs()
                )
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Launch { source, .. } => Some(source),
            CommandError::Timeout { .. } => None,
        }
    }
}
