//! Stream listener.
//!
//! Every `start` spawns one consumption task that forwards decoded messages
//! into a capacity-1 channel. `stop` delivers exactly one stop signal to each
//! task still running and never blocks.

use super::transport::FeedTransport;
use super::types::Message;
use crate::error::FeedError;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Listens to the social feed through any [`FeedTransport`].
pub struct StreamListener<T: ?Sized> {
    transport: Arc<T>,
    stops: Mutex<Vec<oneshot::Sender<()>>>,
    next_task: AtomicUsize,
}

impl<T> StreamListener<T>
where
    T: FeedTransport + ?Sized + 'static,
{
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            stops: Mutex::new(Vec::new()),
            next_task: AtomicUsize::new(1),
        }
    }

    /// Open a filtered subscription and return its message channel.
    ///
    /// The channel closes once the consumption task exits, either because
    /// `stop` was called, the stream ended, or the transport failed.
    pub async fn start(&self, author_ids: &[String]) -> Result<mpsc::Receiver<Message>, FeedError> {
        let mut stream = self.transport.connect(author_ids).await?;
        let (tx, rx) = mpsc::channel(1);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task_no = self.next_task.fetch_add(1, Ordering::Relaxed);
        {
            let mut stops = self.stops.lock().unwrap_or_else(PoisonError::into_inner);
            // Forget tasks that already exited on their own
            stops.retain(|stop| !stop.is_closed());
            stops.push(stop_tx);
        }

        tokio::spawn(async move {
            info!(task = task_no, "Feed consumption started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        debug!(task = task_no, "Stop signal received");
                        break;
                    }
                    item = stream.next() => match item {
                        Some(Ok(message)) => {
                            tokio::select! {
                                sent = tx.send(message) => {
                                    if sent.is_err() {
                                        warn!(task = task_no, "Message receiver dropped");
                                        break;
                                    }
                                }
                                _ = &mut stop_rx => {
                                    debug!(task = task_no, "Stop signal received while handing off");
                                    break;
                                }
                            }
                        }
                        Some(Err(FeedError::Decode(reason))) => {
                            warn!(task = task_no, %reason, "Skipping malformed feed record");
                        }
                        Some(Err(e)) => {
                            error!(task = task_no, error = %e, "Feed stream failed");
                            break;
                        }
                        None => {
                            info!(task = task_no, "Feed stream ended");
                            break;
                        }
                    }
                }
            }

            // Tear the connection down before the output channel closes
            drop(stream);
            info!(task = task_no, "Feed consumption stopped");
        });

        Ok(rx)
    }

    /// Number of consumption tasks still running and not yet stopped.
    pub fn active_subscriptions(&self) -> usize {
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|stop| !stop.is_closed())
            .count()
    }

    /// Send one stop signal per active subscription. Returns how many were
    /// delivered; zero when nothing is active.
    pub fn stop(&self) -> usize {
        let stops: Vec<_> = self
            .stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        // Tasks that already exited dropped their receiver
        let count = stops
            .into_iter()
            .filter(|stop| !stop.is_closed())
            .map(|stop| stop.send(()))
            .filter(Result::is_ok)
            .count();

        if count > 0 {
            info!(subscriptions = count, "Feed listener stopped");
        }
        count
    }
}
