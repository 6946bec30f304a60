//! End-to-end lifecycle behaviour through the orchestrator, against the
//! in-memory service host.

use service_warden::control::fake::FakeServiceHost;
use service_warden::control::ControlAction;
use service_warden::service::{Outcome, ServiceDescriptor, ServiceStatus};
use service_warden::{LifecycleOp, Orchestrator};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(host: &Arc<FakeServiceHost>, settle: Duration) -> Orchestrator {
    Orchestrator::builder()
        .service(ServiceDescriptor::new(
            "test-log",
            "Test Log Service",
            "Writes a heartbeat line every minute",
            "/usr/local/bin/warden worker --service test-log",
        ))
        .service(ServiceDescriptor::new("other", "Other", "", "/usr/bin/other"))
        .fake_host(Arc::clone(host))
        .settle_delay(settle)
        .build()
        .expect("orchestrator should build")
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let host = Arc::new(FakeServiceHost::new());
    let orch = orchestrator(&host, Duration::ZERO);

    let result = orch.start("test-log").await;
    assert_eq!(result.outcome, Outcome::NotInstalled);
    assert!(!result.success);

    assert!(orch.install("test-log").await.success);
    assert_eq!(orch.status("test-log").await.unwrap(), ServiceStatus::Stopped);

    let result = orch.start("test-log").await;
    assert_eq!(result.outcome, Outcome::Completed);

    let result = orch.start("test-log").await;
    assert!(result.success);
    assert_eq!(result.outcome, Outcome::AlreadyRunning);
    assert_eq!(host.invocations(ControlAction::Start, "test-log"), 1);

    let result = orch.uninstall("test-log").await;
    assert_eq!(result.outcome, Outcome::StillRunning);
    assert_eq!(host.invocations(ControlAction::Delete, "test-log"), 0);

    assert!(orch.stop("test-log").await.success);
    assert!(orch.uninstall("test-log").await.success);
    assert_eq!(
        orch.status("test-log").await.unwrap(),
        ServiceStatus::NotInstalled
    );
}

#[tokio::test]
async fn test_start_when_not_installed_never_runs_command() {
    let host = Arc::new(FakeServiceHost::new());
    let orch = orchestrator(&host, Duration::ZERO);

    for _ in 0..2 {
        let result = orch.start("test-log").await;
        assert_eq!(result.outcome, Outcome::NotInstalled);
    }
    assert_eq!(host.invocations(ControlAction::Start, "test-log"), 0);
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_concurrent_operation_is_rejected_as_busy() {
    let host = Arc::new(FakeServiceHost::new().with_command_delay(Duration::from_millis(200)));
    host.insert_installed("test-log", false);
    let orch = Arc::new(orchestrator(&host, Duration::ZERO));

    let first = orch.dispatch("test-log", LifecycleOp::Start);
    // Let the first operation take the gate.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orch.controller("test-log").unwrap().is_busy());

    let second = orch.stop("test-log").await;
    assert_eq!(second.outcome, Outcome::Busy);
    assert!(!second.success);

    let first = first.await.unwrap();
    assert_eq!(first.outcome, Outcome::Completed);
    assert_eq!(host.max_concurrent("test-log"), 1);
    assert_eq!(host.invocations(ControlAction::Stop, "test-log"), 0);
}

#[tokio::test]
async fn test_other_services_are_not_blocked() {
    let host = Arc::new(FakeServiceHost::new().with_command_delay(Duration::from_millis(200)));
    host.insert_installed("test-log", false);
    host.insert_installed("other", false);
    let orch = orchestrator(&host, Duration::ZERO);

    let (a, b) = tokio::join!(orch.start("test-log"), orch.start("other"));
    assert_eq!(a.outcome, Outcome::Completed);
    assert_eq!(b.outcome, Outcome::Completed);
}

#[tokio::test]
async fn test_restart_stops_then_starts() {
    let host = Arc::new(FakeServiceHost::new());
    host.insert_installed("test-log", true);
    let orch = orchestrator(&host, Duration::from_millis(20));

    let result = orch.restart("test-log").await;
    assert!(result.success, "{}", result.message);
    assert_eq!(host.invocations(ControlAction::Stop, "test-log"), 1);
    assert_eq!(host.invocations(ControlAction::Start, "test-log"), 1);

    let order: Vec<ControlAction> = host.commands().iter().map(|c| c.action).collect();
    assert_eq!(order, vec![ControlAction::Stop, ControlAction::Start]);
    assert_eq!(orch.status("test-log").await.unwrap(), ServiceStatus::Running);
}

#[tokio::test]
async fn test_restart_with_failed_stop_returns_stop_result() {
    let host = Arc::new(FakeServiceHost::new());
    host.insert_installed("test-log", true);
    host.fail_next(ControlAction::Stop, 1061);
    let orch = orchestrator(&host, Duration::ZERO);

    let result = orch.restart("test-log").await;
    assert!(!result.success);
    assert_eq!(
        result.outcome,
        Outcome::CommandFailed {
            exit_code: Some(1061)
        }
    );
    assert_eq!(host.invocations(ControlAction::Start, "test-log"), 0);
}

#[tokio::test]
async fn test_restart_cancelled_during_settle_delay() {
    let host = Arc::new(FakeServiceHost::new());
    host.insert_installed("test-log", true);
    let orch = Arc::new(orchestrator(&host, Duration::from_secs(30)));

    let restart = orch.dispatch("test-log", LifecycleOp::Restart);
    tokio::time::sleep(Duration::from_millis(50)).await;
    orch.cleanup().await;

    let result = tokio::time::timeout(Duration::from_secs(2), restart)
        .await
        .expect("restart should observe cancellation")
        .unwrap();
    assert_eq!(result.outcome, Outcome::Cancelled);
    assert_eq!(host.invocations(ControlAction::Start, "test-log"), 0);
    assert_eq!(orch.status("test-log").await.unwrap(), ServiceStatus::Stopped);
}

#[tokio::test]
async fn test_operations_after_cleanup_are_cancelled() {
    let host = Arc::new(FakeServiceHost::new());
    let orch = orchestrator(&host, Duration::ZERO);
    orch.cleanup().await;

    let result = orch.install("test-log").await;
    assert_eq!(result.outcome, Outcome::Cancelled);
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let host = Arc::new(FakeServiceHost::new());
    host.fail_launch(ControlAction::Create);
    let orch = orchestrator(&host, Duration::ZERO);

    let result = orch.install("test-log").await;
    assert_eq!(result.outcome, Outcome::LaunchFailed);
    assert!(result.message.contains("elevation refused"));
    assert_eq!(
        orch.status("test-log").await.unwrap(),
        ServiceStatus::NotInstalled
    );
}

#[tokio::test]
async fn test_unknown_service() {
    let host = Arc::new(FakeServiceHost::new());
    let orch = orchestrator(&host, Duration::ZERO);

    let result = orch.start("missing").await;
    assert_eq!(result.outcome, Outcome::UnknownService);
    assert!(orch.status("missing").await.is_err());
    assert!(orch.available_actions("missing").is_err());
}

#[tokio::test]
async fn test_available_actions_follow_cached_status() {
    let host = Arc::new(FakeServiceHost::new());
    let orch = orchestrator(&host, Duration::ZERO);

    // Unknown until the first poll.
    assert!(orch.available_actions("test-log").unwrap().is_empty());

    orch.refresh().await;
    assert_eq!(
        orch.available_actions("test-log").unwrap(),
        vec![LifecycleOp::Install]
    );

    orch.install("test-log").await;
    orch.refresh().await;
    assert_eq!(
        orch.available_actions("test-log").unwrap(),
        vec![LifecycleOp::Uninstall, LifecycleOp::Start]
    );

    orch.start("test-log").await;
    orch.refresh().await;
    assert_eq!(
        orch.available_actions("test-log").unwrap(),
        vec![LifecycleOp::Stop, LifecycleOp::Restart]
    );
}

#[tokio::test]
async fn test_snapshot_serializes_in_config_order() {
    let host = Arc::new(FakeServiceHost::new());
    host.insert_installed("other", true);
    let orch = orchestrator(&host, Duration::ZERO);
    orch.refresh().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot[0].descriptor.name, "test-log");
    assert_eq!(snapshot[1].status, Some(ServiceStatus::Running));

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json[0]["name"], "test-log");
    assert_eq!(json[0]["status"], "not_installed");
    assert_eq!(json[1]["actions"], serde_json::json!(["stop", "restart"]));
}
