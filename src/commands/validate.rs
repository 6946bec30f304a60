use crate::output::UserOutput;
use service_warden::config::format_duration;
use service_warden::Parser as ConfigParser;
use std::path::Path;

pub fn run_validate(config_path: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status(&format!("Validating {}...", config_path.display()));

    let parser = ConfigParser::new();
    let config = match parser.load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            out.error("Configuration failed to load");
            return Err(e.into());
        }
    };

    config.validate()?;

    out.success("Configuration is valid");
    out.blank();

    out.status(&format!(
        "Backend: {} (settle delay {}, poll interval {})",
        config.backend.resolve(),
        format_duration(config.settle_delay()),
        format_duration(config.poll_interval())
    ));

    out.status(&format!("Services: {}", config.services.len()));
    for service in &config.services {
        out.status(&format!(
            "  - {} ({}): {}",
            service.name,
            service.display_name(),
            service.executable
        ));
    }

    let worker = &config.worker;
    let mut tasks = vec![format!(
        "heartbeat every {}",
        format_duration(worker.heartbeat_interval())
    )];
    if let Some(http) = &worker.http {
        tasks.push(format!("GET {} every {}", http.url, format_duration(http.interval())));
    }
    if let Some(db) = &worker.database {
        tasks.push(format!(
            "database {} every {}",
            db.path.display(),
            format_duration(db.interval())
        ));
    }
    out.blank();
    out.status(&format!("Worker: {}", tasks.join("; ")));

    Ok(())
}
