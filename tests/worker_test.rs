//! Service-mode supervisor: tasks, event log output and bounded shutdown.

use service_warden::config::{DatabaseConfig, HttpPollConfig, WorkerConfig};
use service_warden::eventlog::{EventLog, FileSink, MemorySink};
use service_warden::worker::WorkerSupervisor;
use std::time::{Duration, Instant};

fn worker_config(db_path: std::path::PathBuf) -> WorkerConfig {
    WorkerConfig {
        heartbeat_interval: Some("50ms".to_string()),
        shutdown_timeout: Some("2s".to_string()),
        event_log: None,
        http: Some(HttpPollConfig {
            // Nothing listens here; every poll fails and is logged.
            url: "http://127.0.0.1:59997/api/test".to_string(),
            interval: Some("50ms".to_string()),
            timeout: Some("1s".to_string()),
        }),
        database: Some(DatabaseConfig {
            path: db_path,
            query: None,
            interval: Some("50ms".to_string()),
        }),
    }
}

#[tokio::test]
async fn test_all_tasks_run_and_stop_within_bound() {
    let dir = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();
    let log = EventLog::new(vec![Box::new(sink.clone())]);

    let supervisor =
        WorkerSupervisor::start("test-log", &worker_config(dir.path().join("health.db")), log)
            .unwrap();
    assert_eq!(
        supervisor.task_names(),
        vec!["heartbeat", "http-poll", "db-health"]
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(supervisor.alive_tasks().len(), 3);

    let started = Instant::now();
    let report = supervisor.shutdown().await;
    assert!(report.is_clean(), "{:?}", report);
    assert!(started.elapsed() < Duration::from_secs(2));

    assert!(sink.count_containing("Heartbeat #1") >= 1);
    assert!(sink.count_containing("Database check OK") >= 1);
    assert!(sink.count_containing("GET http://127.0.0.1:59997/api/test failed") >= 1);
}

#[tokio::test]
async fn test_database_session_is_shared_for_ad_hoc_queries() {
    let dir = tempfile::tempdir().unwrap();
    let config = worker_config(dir.path().join("health.db"));
    let supervisor =
        WorkerSupervisor::start("test-log", &config, EventLog::tracing("test-log")).unwrap();

    let db = supervisor.database().expect("database task configured");
    db.execute("CREATE TABLE IF NOT EXISTS beats (n INTEGER)")
        .await
        .unwrap();
    assert_eq!(db.execute("INSERT INTO beats VALUES (1)").await.unwrap(), 1);
    assert_eq!(db.query_scalar("SELECT COUNT(*) FROM beats").await.unwrap(), "1");

    let report = supervisor.shutdown().await;
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_straggler_is_reported_not_awaited() {
    let mut supervisor = WorkerSupervisor::new("test-log", EventLog::tracing("test-log"))
        .with_shutdown_timeout(Duration::from_millis(100));
    // Ignores cancellation entirely.
    supervisor.spawn("stuck", async {
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    supervisor.spawn_heartbeat(Duration::from_secs(60));

    let started = Instant::now();
    let report = supervisor.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.stragglers, vec!["stuck".to_string()]);
    assert!(report.panicked.is_empty());
}

#[tokio::test]
async fn test_file_event_log_receives_worker_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("test-log.log");
    let log = EventLog::new(vec![Box::new(FileSink::open(&path, "test-log").unwrap())]);

    let mut supervisor = WorkerSupervisor::new("test-log", log.clone());
    supervisor.spawn_heartbeat(Duration::from_millis(30));
    log.write_service_started("test-log");
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.shutdown().await;
    log.write_service_stopped("test-log");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines.first().unwrap().contains("Service 'test-log' started"));
    assert!(lines.last().unwrap().contains("Service 'test-log' stopped"));
    assert!(contents.contains("[INFO] test-log: Heartbeat #1"));
}
