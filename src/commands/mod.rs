mod lifecycle;
mod status;
mod validate;
mod watch;
mod worker;

pub use lifecycle::run_lifecycle;
pub use status::run_status;
pub use validate::run_validate;
pub use watch::run_watch;
pub use worker::run_worker;

/// Resolve on SIGTERM or SIGINT (Ctrl-C on non-unix hosts).
pub(crate) async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;
    Ok(())
}
