//! Process interrupt handling.

use log::{error, info};
use std::future::pending;
use tokio::signal;
use tokio::signal::unix::{SignalKind, signal as unix_signal};

/// Resolves on the first SIGINT or SIGTERM.
///
/// A signal whose handler cannot be installed is simply never observed.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for interrupt signal: {}", e);
            pending::<()>().await;
        }
    };

    let terminate = async {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for terminate signal: {}", e);
                pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = interrupt => info!("Received interrupt signal"),
        () = terminate => info!("Received terminate signal"),
    }
}
