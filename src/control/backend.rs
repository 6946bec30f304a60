//! Host-specific rendering of the four control actions.
//!
//! The orchestrator only knows "create / delete / start / stop this service".
//! [`ControlBackend`] turns each of those into a concrete argv for the host's
//! service manager, with an optional privilege-elevation prefix.

use crate::service::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default directory for generated systemd unit files.
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// Which service manager to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Pick based on the compile target.
    #[default]
    Auto,
    Systemd,
    WindowsSc,
}

impl BackendKind {
    /// Resolve `Auto` to the backend for the current platform.
    pub fn resolve(self) -> BackendKind {
        match self {
            BackendKind::Auto if cfg!(windows) => BackendKind::WindowsSc,
            BackendKind::Auto => BackendKind::Systemd,
            other => other,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Auto => write!(f, "auto"),
            BackendKind::Systemd => write!(f, "systemd"),
            BackendKind::WindowsSc => write!(f, "windows-sc"),
        }
    }
}

/// One of the four mutating operations the host service manager supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    /// Register the service with auto-start.
    Create,
    /// Unregister the service.
    Delete,
    Start,
    Stop,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::Create => write!(f, "create"),
            ControlAction::Delete => write!(f, "delete"),
            ControlAction::Start => write!(f, "start"),
            ControlAction::Stop => write!(f, "stop"),
        }
    }
}

/// A fully rendered control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    pub action: ControlAction,
    /// Internal name of the service the command targets.
    pub service: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ControlCommand {
    /// Shell-like rendering for messages and logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_escape)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Builds [`ControlCommand`]s for one host service manager.
#[derive(Debug, Clone)]
pub struct ControlBackend {
    kind: BackendKind,
    elevate: Vec<String>,
    unit_dir: PathBuf,
}

impl ControlBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind: kind.resolve(),
            elevate: Vec::new(),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
        }
    }

    /// Prefix every mutating command with `elevate` (e.g. `["sudo", "-n"]`).
    pub fn with_elevation(mut self, elevate: Vec<String>) -> Self {
        self.elevate = elevate;
        self
    }

    pub fn with_unit_dir(mut self, unit_dir: impl Into<PathBuf>) -> Self {
        self.unit_dir = unit_dir.into();
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }

    /// Render `action` for `descriptor`.
    pub fn command(&self, action: ControlAction, descriptor: &ServiceDescriptor) -> ControlCommand {
        let argv = match self.kind {
            BackendKind::WindowsSc => windows_argv(action, descriptor),
            BackendKind::Systemd | BackendKind::Auto => self.systemd_argv(action, descriptor),
        };

        let mut full: Vec<String> = self.elevate.iter().cloned().chain(argv).collect();
        let program = full.remove(0);
        ControlCommand {
            action,
            service: descriptor.name.clone(),
            program,
            args: full,
        }
    }

    /// Path of the generated unit file for `name`.
    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(unit_name(name))
    }

    /// Contents of the systemd unit written on install.
    pub fn unit_file(&self, descriptor: &ServiceDescriptor) -> String {
        let description = if descriptor.description.trim().is_empty() {
            descriptor.display_name.clone()
        } else {
            format!("{} ({})", descriptor.display_name, descriptor.description.trim())
        };

        format!(
            "[Unit]\n\
             Description={}\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={}\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target",
            single_line(&description),
            single_line(&descriptor.executable)
        )
    }

    fn systemd_argv(&self, action: ControlAction, descriptor: &ServiceDescriptor) -> Vec<String> {
        let unit = unit_name(&descriptor.name);
        match action {
            ControlAction::Create => {
                let unit_path = self.unit_path(&descriptor.name);
                let script = format!(
                    "printf '%s\\n' {} > {} && systemctl daemon-reload && systemctl enable {}",
                    shell_escape(&self.unit_file(descriptor)),
                    shell_escape(&unit_path.to_string_lossy()),
                    shell_escape(&unit)
                );
                vec!["sh".into(), "-c".into(), script]
            }
            ControlAction::Delete => {
                let unit_path = self.unit_path(&descriptor.name);
                let script = format!(
                    "systemctl disable {} && rm -f {} && systemctl daemon-reload",
                    shell_escape(&unit),
                    shell_escape(&unit_path.to_string_lossy())
                );
                vec!["sh".into(), "-c".into(), script]
            }
            ControlAction::Start => vec!["systemctl".into(), "start".into(), unit],
            ControlAction::Stop => vec!["systemctl".into(), "stop".into(), unit],
        }
    }
}

fn windows_argv(action: ControlAction, descriptor: &ServiceDescriptor) -> Vec<String> {
    let name = descriptor.name.clone();
    match action {
        ControlAction::Create => vec![
            "sc.exe".into(),
            "create".into(),
            name,
            "binPath=".into(),
            descriptor.executable.clone(),
            "start=".into(),
            "auto".into(),
            "DisplayName=".into(),
            descriptor.display_name.clone(),
        ],
        ControlAction::Delete => vec!["sc.exe".into(), "delete".into(), name],
        ControlAction::Start => vec!["net".into(), "start".into(), name],
        ControlAction::Stop => vec!["net".into(), "stop".into(), name],
    }
}

/// systemd unit name for a service name (`api` -> `api.service`).
pub fn unit_name(name: &str) -> String {
    if name.ends_with(".service") {
        name.to_string()
    } else {
        format!("{}.service", name)
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

/// Escape a string for safe use in `sh -c` scripts.
/// Wraps the string in single quotes and escapes any single quotes within.
pub(crate) fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    // Safe characters: alphanumeric, dash, underscore, dot only
    if s.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return s.to_string();
    }

    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new(
            "test-log",
            "Test Log Service",
            "Writes a heartbeat",
            "/usr/local/bin/warden worker --service test-log",
        )
    }

    #[test]
    fn systemd_start_and_stop_use_systemctl() {
        let backend = ControlBackend::new(BackendKind::Systemd);
        let start = backend.command(ControlAction::Start, &descriptor());
        assert_eq!(start.program, "systemctl");
        assert_eq!(start.args, vec!["start", "test-log.service"]);

        let stop = backend.command(ControlAction::Stop, &descriptor());
        assert_eq!(stop.display(), "systemctl stop test-log.service");
        assert_eq!(stop.service, "test-log");
    }

    #[test]
    fn systemd_create_writes_unit_and_enables() {
        let backend = ControlBackend::new(BackendKind::Systemd).with_unit_dir("/tmp/units");
        let create = backend.command(ControlAction::Create, &descriptor());
        assert_eq!(create.program, "sh");
        assert_eq!(create.args[0], "-c");
        let script = &create.args[1];
        assert!(script.contains("> /tmp/units/test-log.service"));
        assert!(script.contains("systemctl daemon-reload"));
        assert!(script.ends_with("systemctl enable test-log.service"));
        assert!(script.contains("ExecStart=/usr/local/bin/warden worker --service test-log"));
    }

    #[test]
    fn unit_file_includes_description() {
        let backend = ControlBackend::new(BackendKind::Systemd);
        let unit = backend.unit_file(&descriptor());
        assert!(unit.contains("Description=Test Log Service (Writes a heartbeat)"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn elevation_prefixes_every_command() {
        let backend = ControlBackend::new(BackendKind::Systemd)
            .with_elevation(vec!["sudo".into(), "-n".into()]);
        let start = backend.command(ControlAction::Start, &descriptor());
        assert_eq!(start.program, "sudo");
        assert_eq!(start.args, vec!["-n", "systemctl", "start", "test-log.service"]);
    }

    #[test]
    fn windows_commands_match_sc_and_net() {
        let backend = ControlBackend::new(BackendKind::WindowsSc);
        let create = backend.command(ControlAction::Create, &descriptor());
        assert_eq!(create.program, "sc.exe");
        assert_eq!(
            create.args,
            vec![
                "create",
                "test-log",
                "binPath=",
                "/usr/local/bin/warden worker --service test-log",
                "start=",
                "auto",
                "DisplayName=",
                "Test Log Service",
            ]
        );

        let delete = backend.command(ControlAction::Delete, &descriptor());
        assert_eq!(delete.display(), "sc.exe delete test-log");

        let start = backend.command(ControlAction::Start, &descriptor());
        assert_eq!(start.display(), "net start test-log");
    }

    #[test]
    fn auto_resolves_to_platform_backend() {
        let resolved = BackendKind::Auto.resolve();
        if cfg!(windows) {
            assert_eq!(resolved, BackendKind::WindowsSc);
        } else {
            assert_eq!(resolved, BackendKind::Systemd);
        }
    }

    #[test]
    fn shell_escape_quotes_special_characters() {
        assert_eq!(shell_escape("simple"), "simple");
        assert_eq!(shell_escape(""), "''");
        assert_eq!(shell_escape("a b"), "'a b'");
        assert_eq!(shell_escape("it's"), r"'it'\''s'");
    }

    #[test]
    fn unit_name_is_not_doubled() {
        assert_eq!(unit_name("api"), "api.service");
        assert_eq!(unit_name("api.service"), "api.service");
    }
}
