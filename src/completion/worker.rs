//! Completion worker thread
//!
//! Runs the HTTP client on its own thread with its own tokio runtime, so the
//! session controller's select loop never blocks on network I/O. One request
//! is processed at a time; the controller enforces one in-flight request, the
//! worker simply drains its queue in order.

use super::{CompletionCommand, CompletionEvent, CompletionHandle, GeminiClient};
use crate::{PrattleError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;
use tracing::{debug, info};

const CHANNEL_CAPACITY: usize = 16;

/// Spawns the worker thread that services completion requests
pub struct CompletionWorker {
    client: GeminiClient,
}

impl CompletionWorker {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Start the worker thread
    ///
    /// Returns a handle for submitting requests and receiving events, plus
    /// the thread's join handle for orderly teardown.
    pub fn start(self) -> Result<(CompletionHandle, JoinHandle<()>)> {
        let (command_tx, command_rx) = bounded::<CompletionCommand>(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded::<CompletionEvent>(CHANNEL_CAPACITY);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                PrattleError::ConfigError(format!("Failed to create tokio runtime: {}", e))
            })?;

        let client = self.client;
        let worker_handle = std::thread::spawn(move || {
            runtime.block_on(worker_loop(client, command_rx, event_tx));
        });

        Ok((
            CompletionHandle::from_parts(command_tx, event_rx),
            worker_handle,
        ))
    }
}

/// Main worker loop: one command in, one terminal event out
async fn worker_loop(
    client: GeminiClient,
    command_rx: Receiver<CompletionCommand>,
    event_tx: Sender<CompletionEvent>,
) {
    info!("Completion worker starting");

    loop {
        let command = match command_rx.recv() {
            Ok(cmd) => cmd,
            Err(_) => {
                info!("Command channel closed, shutting down");
                break;
            }
        };

        match command {
            CompletionCommand::Submit { request_id, text } => {
                debug!("Processing completion request {}", request_id);

                let event = match client.complete(&text).await {
                    Ok(text) => CompletionEvent::Resolved { request_id, text },
                    Err(e) => CompletionEvent::Failed {
                        request_id,
                        error: e.to_string(),
                    },
                };

                if event_tx.send(event).is_err() {
                    info!("Event channel closed, shutting down");
                    return;
                }
            }

            CompletionCommand::Shutdown => {
                info!("Received shutdown command");
                break;
            }
        }
    }

    let _ = event_tx.send(CompletionEvent::Shutdown);
    info!("Completion worker shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionConfig;
    use std::time::Duration;

    #[test]
    fn test_worker_shutdown_handshake() {
        let client = GeminiClient::new(CompletionConfig::default()).unwrap();
        let (handle, join) = CompletionWorker::new(client).start().unwrap();

        handle.shutdown().unwrap();
        join.join().unwrap();

        // The worker confirms shutdown as its final event
        match handle
            .event_receiver()
            .recv_timeout(Duration::from_secs(1))
            .unwrap()
        {
            CompletionEvent::Shutdown => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
