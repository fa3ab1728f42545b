//! Shutdown flag shared by long-running tasks.

use tokio::sync::watch;

/// Resolves once shutdown is requested or the flag's sender is dropped.
///
/// The `watch::Ref` from `wait_for` is released before returning, so the
/// future stays `Send` when raced inside `select!` against arms that await.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
