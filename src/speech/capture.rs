//! Speech capture contract
//!
//! The platform side receives `CaptureCommand`s and emits `CaptureEvent`s:
//! any number of `Transcript` updates (each carrying the full accumulated
//! transcript so far), then exactly one `Ended` per start/stop cycle. The
//! controller exclusively owns the capture channel; nothing else may start
//! or stop it.

use crate::{PrattleError, Result};
use crossbeam_channel::{never, Receiver, Sender};

/// Commands sent to the capture backend
#[derive(Clone, Debug)]
pub enum CaptureCommand {
    /// Begin a capture cycle
    Start,
    /// End the current capture cycle; an `Ended` event follows
    Stop,
}

/// Events emitted by the capture backend
#[derive(Clone, Debug)]
pub enum CaptureEvent {
    /// Full accumulated transcript so far
    Transcript(String),
    /// The capture cycle ended (requested or autonomous)
    Ended,
    /// Capture failed mid-cycle
    Error(String),
}

/// Handle for controlling a speech capture backend
pub struct CaptureHandle {
    command_tx: Option<Sender<CaptureCommand>>,
    event_rx: Receiver<CaptureEvent>,
}

impl CaptureHandle {
    /// A handle backed by a capture implementation
    pub fn from_parts(command_tx: Sender<CaptureCommand>, event_rx: Receiver<CaptureEvent>) -> Self {
        Self {
            command_tx: Some(command_tx),
            event_rx,
        }
    }

    /// A handle for a platform without speech capture
    ///
    /// `start()` fails, and the event receiver never fires.
    pub fn unavailable() -> Self {
        Self {
            command_tx: None,
            event_rx: never(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.command_tx.is_some()
    }

    /// Start a capture cycle
    pub fn start(&self) -> Result<()> {
        match &self.command_tx {
            Some(tx) => tx.send(CaptureCommand::Start).map_err(|e| {
                PrattleError::ChannelError(format!("Failed to start capture: {}", e))
            }),
            None => Err(PrattleError::CapabilityUnavailable(
                "speech capture is not supported on this platform".to_string(),
            )),
        }
    }

    /// Stop the current capture cycle
    pub fn stop(&self) -> Result<()> {
        match &self.command_tx {
            Some(tx) => tx
                .send(CaptureCommand::Stop)
                .map_err(|e| PrattleError::ChannelError(format!("Failed to stop capture: {}", e))),
            None => Err(PrattleError::CapabilityUnavailable(
                "speech capture is not supported on this platform".to_string(),
            )),
        }
    }

    /// Event receiver, for use in a select loop
    pub fn event_receiver(&self) -> Receiver<CaptureEvent> {
        self.event_rx.clone()
    }
}
