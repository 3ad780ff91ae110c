//! Remote completion service
//!
//! The session controller talks to the completion service through a pair of
//! channels carrying tagged commands and events. Each submitted request
//! carries a `request_id`; exactly one terminal event (`Resolved` or
//! `Failed`) is emitted per request, echoing that id so the controller can
//! discard anything stale.

mod gemini;
mod worker;

pub use gemini::{GeminiClient, EMPTY_REPLY_FALLBACK, UNREACHABLE_FALLBACK};
pub use worker::CompletionWorker;

use crate::{PrattleError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use uuid::Uuid;

/// Configuration for the completion service
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// API key, passed as a query parameter
    pub api_key: String,
    /// Model identifier appended to the base URL
    pub model: String,
    /// Base URL of the generative-language endpoint
    pub base_url: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-pro".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full `generateContent` endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

/// Commands sent to the completion worker
#[derive(Clone, Debug)]
pub enum CompletionCommand {
    /// Submit text and await a reply
    Submit { request_id: Uuid, text: String },
    /// Shut the worker down
    Shutdown,
}

/// Events emitted by the completion worker
#[derive(Clone, Debug)]
pub enum CompletionEvent {
    /// The request resolved with reply text
    Resolved { request_id: Uuid, text: String },
    /// The request failed; no reply text is available
    Failed { request_id: Uuid, error: String },
    /// Worker shut down
    Shutdown,
}

/// Handle for talking to a completion worker
///
/// Also constructible from raw channel halves so tests (or an alternative
/// backend) can play the worker's role.
pub struct CompletionHandle {
    command_tx: Sender<CompletionCommand>,
    event_rx: Receiver<CompletionEvent>,
}

impl CompletionHandle {
    pub fn from_parts(
        command_tx: Sender<CompletionCommand>,
        event_rx: Receiver<CompletionEvent>,
    ) -> Self {
        Self {
            command_tx,
            event_rx,
        }
    }

    /// Submit text for completion
    pub fn submit(&self, request_id: Uuid, text: String) -> Result<()> {
        self.command_tx
            .send(CompletionCommand::Submit { request_id, text })
            .map_err(|e| PrattleError::ChannelError(format!("Failed to submit request: {}", e)))
    }

    /// Request worker shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(CompletionCommand::Shutdown)
            .map_err(|e| PrattleError::ChannelError(format!("Failed to send shutdown: {}", e)))
    }

    /// Event receiver, for use in a select loop
    pub fn event_receiver(&self) -> Receiver<CompletionEvent> {
        self.event_rx.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<CompletionEvent> {
        self.event_rx.try_recv().ok()
    }
}
