use crate::output::UserOutput;
use service_warden::{LifecycleOp, Orchestrator, ServiceStatus};

pub async fn run_status(
    orchestrator: &Orchestrator,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    orchestrator.refresh().await;
    let snapshot = orchestrator.snapshot();

    if json {
        out.status(&serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    out.status("Service Status:");
    out.status(&format!("{:-<72}", ""));

    for row in snapshot {
        let status_icon = match row.status {
            Some(ServiceStatus::Running) => "+",
            Some(ServiceStatus::Stopped) => "o",
            Some(ServiceStatus::NotInstalled) | None => "-",
        };
        let status = row
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let actions = if row.busy {
            "(busy)".to_string()
        } else {
            join_actions(&row.actions)
        };
        out.status(&format!(
            "  {} {:<24} {:<14} {}",
            status_icon, row.descriptor.name, status, actions
        ));
        if row.descriptor.display_name != row.descriptor.name {
            out.status(&format!("    {}", row.descriptor.display_name));
        }
    }

    Ok(())
}

fn join_actions(actions: &[LifecycleOp]) -> String {
    actions
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
