//! Speech synthesis contract and voice selection
//!
//! The platform side receives `SynthesisCommand`s and emits one `Started`
//! and one `Ended` per utterance. Cancelling suppresses the pending `Ended`
//! best-effort; the controller tolerates one arriving anyway by matching
//! utterance ids.
//!
//! Voice selection is a pure heuristic over whatever voices the platform has
//! reported so far. The inventory fills in asynchronously and may be empty
//! at session start, so it is re-read on every speak and an empty list falls
//! back to the engine default instead of failing the request.

use crate::{PrattleError, Result};
use crossbeam_channel::{never, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Prosody options for one utterance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeakOptions {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// One synthesis voice reported by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub language: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Pick the first voice whose name matches any preferred identifier
///
/// Returns `None` when nothing matches (including the empty list), which
/// means the engine default.
pub fn select_voice<'a>(voices: &'a [Voice], preferred: &[String]) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|voice| preferred.iter().any(|p| voice.name.contains(p.as_str())))
}

/// Shared, asynchronously populated voice list
#[derive(Clone, Default)]
pub struct VoiceInventory {
    voices: Arc<RwLock<Vec<Voice>>>,
}

impl VoiceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known voices with the platform's latest report
    pub fn replace(&self, voices: Vec<Voice>) {
        *self.voices.write() = voices;
    }

    pub fn all(&self) -> Vec<Voice> {
        self.voices.read().clone()
    }

    /// Run the selection heuristic against the current list
    pub fn select(&self, preferred: &[String]) -> Option<Voice> {
        select_voice(&self.voices.read(), preferred).cloned()
    }
}

/// Commands sent to the synthesis backend
#[derive(Clone, Debug)]
pub enum SynthesisCommand {
    /// Speak one utterance
    Speak {
        utterance_id: Uuid,
        text: String,
        options: SpeakOptions,
        /// Selected voice, or `None` for the engine default
        voice: Option<Voice>,
    },
    /// Cancel the in-flight utterance, if any
    Cancel,
}

/// Events emitted by the synthesis backend
#[derive(Clone, Debug)]
pub enum SynthesisEvent {
    /// Output began for this utterance
    Started { utterance_id: Uuid },
    /// Output finished naturally for this utterance
    Ended { utterance_id: Uuid },
}

/// Handle for controlling a speech synthesis backend
pub struct SynthesisHandle {
    command_tx: Option<Sender<SynthesisCommand>>,
    event_rx: Receiver<SynthesisEvent>,
    voices: VoiceInventory,
}

impl SynthesisHandle {
    /// A handle backed by a synthesis implementation
    pub fn from_parts(
        command_tx: Sender<SynthesisCommand>,
        event_rx: Receiver<SynthesisEvent>,
        voices: VoiceInventory,
    ) -> Self {
        Self {
            command_tx: Some(command_tx),
            event_rx,
            voices,
        }
    }

    /// A handle for a platform without speech synthesis
    pub fn unavailable() -> Self {
        Self {
            command_tx: None,
            event_rx: never(),
            voices: VoiceInventory::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.command_tx.is_some()
    }

    /// Speak one utterance
    ///
    /// Always cancels any prior utterance first so two outputs can never
    /// overlap. The voice is selected against the current inventory on every
    /// call.
    pub fn speak(
        &self,
        utterance_id: Uuid,
        text: impl Into<String>,
        options: SpeakOptions,
        preferred_voices: &[String],
    ) -> Result<()> {
        let tx = self.command_tx.as_ref().ok_or_else(|| {
            PrattleError::CapabilityUnavailable(
                "speech synthesis is not supported on this platform".to_string(),
            )
        })?;

        tx.send(SynthesisCommand::Cancel)
            .map_err(|e| PrattleError::ChannelError(format!("Failed to cancel speech: {}", e)))?;

        let voice = self.voices.select(preferred_voices);
        tx.send(SynthesisCommand::Speak {
            utterance_id,
            text: text.into(),
            options,
            voice,
        })
        .map_err(|e| PrattleError::ChannelError(format!("Failed to start speech: {}", e)))
    }

    /// Cancel the in-flight utterance
    pub fn cancel(&self) -> Result<()> {
        match &self.command_tx {
            Some(tx) => tx
                .send(SynthesisCommand::Cancel)
                .map_err(|e| PrattleError::ChannelError(format!("Failed to cancel speech: {}", e))),
            None => Err(PrattleError::CapabilityUnavailable(
                "speech synthesis is not supported on this platform".to_string(),
            )),
        }
    }

    /// Event receiver, for use in a select loop
    pub fn event_receiver(&self) -> Receiver<SynthesisEvent> {
        self.event_rx.clone()
    }

    /// The shared voice inventory behind this handle
    pub fn voices(&self) -> VoiceInventory {
        self.voices.clone()
    }
}
