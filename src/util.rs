//! Process-level helpers.

use tokio::signal::unix::{SignalKind, signal};

/// Returns `true` if the process runs with effective uid 0.
#[must_use]
pub fn is_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Registers SIGTERM and SIGINT handlers and returns a future that resolves
/// when either arrives.
///
/// Must be called from within a tokio runtime. Registration happens before
/// this returns, so a signal delivered before the future is first polled is
/// not lost.
///
/// # Errors
///
/// Returns the OS error if a handler cannot be registered.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
        }
    })
}
