//! In-memory service host for tests and dry runs.
//!
//! [`FakeServiceHost`] implements both [`CommandRunner`] and
//! [`ServiceStatusProbe`] over a small registry, so lifecycle behaviour can be
//! exercised without touching systemd or the Windows service manager.
//!
//! ```
//! use service_warden::control::fake::FakeServiceHost;
//! use service_warden::control::ControlAction;
//!
//! let host = FakeServiceHost::new();
//! host.insert_installed("api", false);
//! host.fail_next(ControlAction::Start, 1053);
//! assert_eq!(host.invocations(ControlAction::Start, "api"), 0);
//! ```

use super::runner::failure_result;
use super::{CommandError, CommandRunner, ControlAction, ControlCommand, ServiceStatusProbe};
use crate::service::LifecycleResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Injected {
    Exit(i32),
    Launch,
}

#[derive(Debug, Default)]
struct HostState {
    /// Installed services and whether each is running.
    services: HashMap<String, bool>,
    commands: Vec<ControlCommand>,
    injected: HashMap<ControlAction, VecDeque<Injected>>,
    probe_failure: bool,
    /// Commands currently executing, per service.
    running_commands: HashMap<String, usize>,
    max_concurrent: HashMap<String, usize>,
}

/// Fake host service manager.
#[derive(Debug, Default)]
pub struct FakeServiceHost {
    state: Mutex<HostState>,
    command_delay: Duration,
}

impl FakeServiceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command sleeps for `delay` before taking effect.
    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    /// Register `name` as already installed.
    pub fn insert_installed(&self, name: &str, running: bool) {
        self.state.lock().services.insert(name.to_string(), running);
    }

    /// Change the running flag behind the controller's back (e.g. a crash).
    pub fn set_running(&self, name: &str, running: bool) {
        if let Some(state) = self.state.lock().services.get_mut(name) {
            *state = running;
        }
    }

    /// Remove `name` from the registry without going through a command.
    pub fn remove(&self, name: &str) {
        self.state.lock().services.remove(name);
    }

    /// The next `action` command exits with `exit_code` and has no effect.
    pub fn fail_next(&self, action: ControlAction, exit_code: i32) {
        self.state
            .lock()
            .injected
            .entry(action)
            .or_default()
            .push_back(Injected::Exit(exit_code));
    }

    /// The next `action` command cannot be launched.
    pub fn fail_launch(&self, action: ControlAction) {
        self.state
            .lock()
            .injected
            .entry(action)
            .or_default()
            .push_back(Injected::Launch);
    }

    /// While set, every probe answers `false`.
    pub fn set_probe_failure(&self, failing: bool) {
        self.state.lock().probe_failure = failing;
    }

    /// How many times `action` was issued for `name`.
    pub fn invocations(&self, action: ControlAction, name: &str) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| c.action == action && c.service == name)
            .count()
    }

    /// Every command issued so far, in order.
    pub fn commands(&self) -> Vec<ControlCommand> {
        self.state.lock().commands.clone()
    }

    /// Highest number of commands ever executing at once for `name`.
    pub fn max_concurrent(&self, name: &str) -> usize {
        self.state
            .lock()
            .max_concurrent
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn is_installed(&self, name: &str) -> bool {
        self.state.lock().services.contains_key(name)
    }
}

/// Decrements the per-service command counter even if the command future is dropped.
struct CommandSlot<'a> {
    host: &'a FakeServiceHost,
    service: String,
}

impl Drop for CommandSlot<'_> {
    fn drop(&mut self) {
        if let Some(n) = self.host.state.lock().running_commands.get_mut(&self.service) {
            *n = n.saturating_sub(1);
        }
    }
}

#[async_trait]
impl CommandRunner for FakeServiceHost {
    async fn run(&self, command: &ControlCommand) -> Result<LifecycleResult, CommandError> {
        let injected = {
            let mut state = self.state.lock();
            state.commands.push(command.clone());
            let current = {
                let n = state
                    .running_commands
                    .entry(command.service.clone())
                    .or_insert(0);
                *n += 1;
                *n
            };
            let max = state
                .max_concurrent
                .entry(command.service.clone())
                .or_insert(0);
            *max = (*max).max(current);
            state
                .injected
                .get_mut(&command.action)
                .and_then(|queue| queue.pop_front())
        };
        let _slot = CommandSlot {
            host: self,
            service: command.service.clone(),
        };

        if !self.command_delay.is_zero() {
            tokio::time::sleep(self.command_delay).await;
        }

        match injected {
            Some(Injected::Launch) => {
                return Err(CommandError::launch(
                    command.display(),
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "elevation refused"),
                ))
            }
            Some(Injected::Exit(code)) => {
                return Ok(failure_result(command, Some(code), "injected failure"))
            }
            None => {}
        }

        let mut state = self.state.lock();
        let name = command.service.as_str();
        let outcome = match command.action {
            ControlAction::Create => {
                if state.services.contains_key(name) {
                    Err("The specified service already exists.")
                } else {
                    state.services.insert(name.to_string(), false);
                    Ok(())
                }
            }
            ControlAction::Delete => match state.services.remove(name) {
                Some(_) => Ok(()),
                None => Err("The specified service does not exist as an installed service."),
            },
            ControlAction::Start => match state.services.get_mut(name) {
                Some(running) => {
                    *running = true;
                    Ok(())
                }
                None => Err("The specified service does not exist as an installed service."),
            },
            ControlAction::Stop => match state.services.get_mut(name) {
                Some(running) => {
                    *running = false;
                    Ok(())
                }
                None => Err("The specified service does not exist as an installed service."),
            },
        };

        Ok(match outcome {
            Ok(()) => LifecycleResult::completed(format!(
                "{} of '{}' succeeded",
                command.action, name
            )),
            Err(detail) => failure_result(command, Some(1), detail),
        })
    }
}

#[async_trait]
impl ServiceStatusProbe for FakeServiceHost {
    async fn exists(&self, name: &str) -> bool {
        let state = self.state.lock();
        !state.probe_failure && state.services.contains_key(name)
    }

    async fn is_running(&self, name: &str) -> bool {
        let state = self.state.lock();
        !state.probe_failure && state.services.get(name).copied().unwrap_or(false)
    }
}
