use service_warden::config::Parser;
use service_warden::control::BackendKind;
use service_warden::Orchestrator;
use std::fs;
use std::time::Duration;

const FULL_CONFIG: &str = r#"
backend: systemd
elevate: [sudo, -n]
unit_dir: units
settle_delay: 500ms
poll_interval: 1s
command_timeout: 2m

services:
  - name: test-log
    display_name: Test Log Service
    description: Writes a heartbeat line every minute
    executable: /usr/local/bin/warden worker --service test-log
  - name: api
    executable: /usr/bin/api

worker:
  heartbeat_interval: 30s
  event_log: logs/test-log.log
  http:
    url: http://localhost:8080/api/test
  database:
    path: data/health.db
"#;

#[test]
fn test_load_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.yaml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = Parser::new().load_config(&path).expect("config should load");
    config.validate().expect("config should be valid");

    assert_eq!(config.backend, BackendKind::Systemd);
    assert_eq!(config.settle_delay(), Duration::from_millis(500));
    assert_eq!(config.command_timeout(), Duration::from_secs(120));
    assert_eq!(config.services.len(), 2);
    assert_eq!(config.services[1].display_name(), "api");

    // Relative paths resolve against the config file's directory.
    assert_eq!(config.unit_dir.as_deref(), Some(dir.path().join("units").as_path()));
    assert_eq!(
        config.worker.event_log.as_deref(),
        Some(dir.path().join("logs/test-log.log").as_path())
    );
    assert_eq!(
        config.worker.database.as_ref().unwrap().path,
        dir.path().join("data/health.db")
    );
    assert_eq!(config.worker.heartbeat_interval(), Duration::from_secs(30));
    assert_eq!(
        config.worker.http.as_ref().unwrap().interval(),
        Duration::from_secs(30)
    );
}

#[test]
fn test_elevation_prefixes_mutating_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.yaml");
    fs::write(&path, FULL_CONFIG).unwrap();
    let config = Parser::new().load_config(&path).unwrap();

    let backend = config.control_backend();
    let descriptor = config.service("test-log").unwrap().to_descriptor();
    let command = backend.command(service_warden::control::ControlAction::Start, &descriptor);
    assert_eq!(command.program, "sudo");
    assert_eq!(command.args[0], "-n");
    assert!(command.args.contains(&"systemctl".to_string()));
}

#[test]
fn test_orchestrator_from_config_keeps_order() {
    let config = Parser::new().parse_config(FULL_CONFIG).unwrap();
    let orchestrator = Orchestrator::builder().config(config).build().unwrap();

    let names: Vec<&str> = orchestrator
        .services()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["test-log", "api"]);
    assert_eq!(
        orchestrator.controller("test-log").unwrap().settle_delay(),
        Duration::from_millis(500)
    );
}

#[test]
fn test_find_config_walks_up() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("warden.yml"), FULL_CONFIG).unwrap();
    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let found = Parser::find_config_in_dir(&nested).unwrap();
    assert_eq!(found, dir.path().join("warden.yml"));
}

#[test]
fn test_invalid_configs_are_rejected() {
    let parser = Parser::new();
    let cases = [
        // No services.
        "services: []\n",
        // Duplicate names.
        "services:\n  - {name: a, executable: /bin/a}\n  - {name: a, executable: /bin/b}\n",
        // Empty executable.
        "services:\n  - {name: a, executable: ''}\n",
        // Bad duration.
        "settle_delay: 2 seconds\nservices:\n  - {name: a, executable: /bin/a}\n",
        // Non-http poll URL.
        "services:\n  - {name: a, executable: /bin/a}\nworker:\n  http: {url: 'ftp://host/x'}\n",
    ];
    for yaml in cases {
        let config = parser.parse_config(yaml).unwrap();
        assert!(config.validate().is_err(), "should reject:\n{}", yaml);
    }
}

#[test]
fn test_missing_config_has_hint() {
    let dir = tempfile::tempdir().unwrap();
    let err = Parser::find_config_in_dir(dir.path()).unwrap_err();
    assert!(err.suggestion().is_some());
}
