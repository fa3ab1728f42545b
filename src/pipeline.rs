//! Task wiring.
//!
//! feed → listener task → detector/filter task → executor task.
//! Every hop is a capacity-1 channel, so a slow executor stalls detection
//! and, behind it, feed consumption. All stages watch the same shutdown flag.

use crate::feed::Message;
use crate::signal::{BuySignal, SignalDetector};
use crate::utils::shutdown_requested;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Channel capacity between stages.
pub const HANDOFF_CAPACITY: usize = 1;

/// Hand-off channel used between pipeline stages.
pub fn handoff<T>() -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(HANDOFF_CAPACITY)
}

/// Run messages through the detector and forward resulting buy signals.
///
/// Returns when the message channel closes, the signal receiver is gone, or
/// shutdown is requested. Dropping `signals` on return closes the executor's
/// input.
pub async fn forward_signals(
    detector: SignalDetector,
    mut messages: mpsc::Receiver<Message>,
    signals: mpsc::Sender<BuySignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    'messages: loop {
        let message = tokio::select! {
            message = messages.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = shutdown_requested(&mut shutdown) => break,
        };

        for signal in detector.handle(&message) {
            debug!(symbol = %signal.symbol, "Forwarding buy signal");
            tokio::select! {
                sent = signals.send(signal) => {
                    if sent.is_err() {
                        break 'messages;
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break 'messages,
            }
        }
    }

    info!("Signal forwarding stopped");
}
