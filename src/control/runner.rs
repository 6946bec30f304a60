//! Execution of rendered control commands.

use super::{CommandError, ControlCommand};
use crate::service::{LifecycleResult, Outcome};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;

/// Default upper bound on a single control command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of stderr characters carried into a failure message.
const STDERR_EXCERPT_CHARS: usize = 400;

/// Runs one control command against the host.
///
/// A command that ran and exited non-zero is a normal failed
/// [`LifecycleResult`]. `Err` is reserved for commands that never produced an
/// exit code (launch failure, timeout).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &ControlCommand) -> Result<LifecycleResult, CommandError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &ControlCommand) -> Result<LifecycleResult, CommandError> {
        let cmd_str = command.display();
        tracing::info!(service = %command.service, action = %command.action, "Running: {}", cmd_str);

        // kill_on_drop: when the timeout drops the output future the child is killed.
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(CommandError::launch(cmd_str, e)),
            Err(_) => return Err(CommandError::timeout(cmd_str, self.timeout)),
        };

        if output.status.success() {
            tracing::debug!(service = %command.service, "'{}' exited 0", cmd_str);
            return Ok(LifecycleResult::completed(format!(
                "{} of '{}' succeeded",
                capitalize(&command.action.to_string()),
                command.service
            )));
        }

        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // sc.exe and net print their diagnostics on stdout.
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };

        tracing::warn!(
            service = %command.service,
            exit_code = ?exit_code,
            "'{}' failed",
            cmd_str
        );

        Ok(failure_result(command, exit_code, detail))
    }
}

/// Build the failed result for a command that ran and exited non-zero.
pub(crate) fn failure_result(
    command: &ControlCommand,
    exit_code: Option<i32>,
    detail: &str,
) -> LifecycleResult {
    let code = match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let mut message = format!(
        "Failed to {} '{}': '{}' {}",
        command.action,
        command.service,
        command.program,
        code
    );
    if !detail.is_empty() {
        message.push_str(": ");
        message.push_str(&excerpt(detail));
    }
    LifecycleResult::new(Outcome::CommandFailed { exit_code }, message)
}

fn excerpt(detail: &str) -> String {
    if detail.chars().count() <= STDERR_EXCERPT_CHARS {
        detail.to_string()
    } else {
        let head: String = detail.chars().take(STDERR_EXCERPT_CHARS).collect();
        format!("{}...", head)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlAction;

    fn command(program: &str, args: &[&str]) -> ControlCommand {
        ControlCommand {
            action: ControlAction::Start,
            service: "api".to_string(),
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn failure_message_includes_exit_code_and_detail() {
        let result = failure_result(&command("systemctl", &[]), Some(5), "Unit api.service not found.");
        assert!(!result.success);
        assert_eq!(result.outcome, Outcome::CommandFailed { exit_code: Some(5) });
        assert_eq!(
            result.message,
            "Failed to start 'api': 'systemctl' exit code 5: Unit api.service not found."
        );
    }

    #[test]
    fn failure_message_without_exit_code() {
        let result = failure_result(&command("net", &[]), None, "");
        assert_eq!(result.message, "Failed to start 'api': 'net' terminated by signal");
    }

    #[test]
    fn long_detail_is_truncated() {
        let detail = "x".repeat(1000);
        let result = failure_result(&command("sh", &[]), Some(1), &detail);
        assert!(result.message.ends_with("..."));
        assert!(result.message.len() < 500);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() {
        let runner = SystemCommandRunner::default();
        let result = runner.run(&command("true", &[])).await.unwrap();
        assert!(result.success);
        assert_eq!(result.outcome, Outcome::Completed);
        assert_eq!(result.message, "Start of 'api' succeeded");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_a_result_not_an_error() {
        let runner = SystemCommandRunner::default();
        let result = runner
            .run(&command("sh", &["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.outcome, Outcome::CommandFailed { exit_code: Some(3) });
        assert!(result.message.contains("exit code 3"));
        assert!(result.message.contains("boom"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let runner = SystemCommandRunner::default();
        let err = runner
            .run(&command("warden-definitely-not-a-real-binary", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = SystemCommandRunner::new(Duration::from_millis(100));
        let err = runner.run(&command("sleep", &["5"])).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
