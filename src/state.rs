//! Session state for the Prattle assistant
//!
//! This module provides the thread-safe shared state accessed by:
//! - **SessionController**: writes state changes in response to events
//! - **Front ends**: read state for rendering, send commands
//!
//! The design separates:
//! - **State**: shared data that can be queried synchronously
//! - **Commands**: requests to change state (sent to the controller)
//! - **Events**: notifications for UI updates (notices, appended messages)

use crate::messages::Message;
use parking_lot::RwLock;
use std::sync::Arc;

/// The assistant's interaction state
///
/// Exactly one value is active at any instant; transitions happen only inside
/// the session controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssistantState {
    /// Waiting for user input
    #[default]
    Idle,
    /// Microphone capture active, transcript accumulating
    Listening,
    /// A completion request is in flight
    Processing,
    /// Speaking a reply aloud
    Speaking,
}

impl AssistantState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AssistantState::Idle)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, AssistantState::Listening)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, AssistantState::Processing)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, AssistantState::Speaking)
    }

    /// Check if the session is in an active state (not idle)
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantState::Idle => write!(f, "Idle"),
            AssistantState::Listening => write!(f, "Listening"),
            AssistantState::Processing => write!(f, "Processing"),
            AssistantState::Speaking => write!(f, "Speaking"),
        }
    }
}

/// Mutable session state
///
/// This is the single source of truth for the session. It can be shared
/// across threads using `SharedSessionState`.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    /// Current interaction state
    pub state: AssistantState,
    /// In-progress transcript, owned while Listening
    pub pending_transcript: String,
    /// Current error (if any)
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an immutable snapshot of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            pending_transcript: self.pending_transcript.clone(),
            error: self.error.clone(),
        }
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // === State transitions ===

    /// Enter Listening: capture started, transcript buffer reset
    pub fn start_listening(&mut self) {
        self.state = AssistantState::Listening;
        self.pending_transcript.clear();
        self.clear_error();
    }

    /// Replace the pending transcript with the latest capture result
    ///
    /// The platform reports the full accumulated transcript on every update,
    /// so this replaces rather than appends.
    pub fn update_transcript(&mut self, text: String) {
        self.pending_transcript = text;
    }

    /// Take the pending transcript, leaving the buffer empty
    ///
    /// Called exactly when leaving Listening so the submitted text is latched
    /// at the stop trigger and later stray updates cannot change it.
    pub fn take_transcript(&mut self) -> String {
        std::mem::take(&mut self.pending_transcript)
    }

    /// Enter Processing: a completion request is being dispatched
    pub fn begin_processing(&mut self) {
        self.state = AssistantState::Processing;
        self.pending_transcript.clear();
    }

    /// Enter Speaking: a reply is being spoken
    pub fn begin_speaking(&mut self) {
        self.state = AssistantState::Speaking;
    }

    /// Return to Idle, dropping any pending transcript
    pub fn return_to_idle(&mut self) {
        self.state = AssistantState::Idle;
        self.pending_transcript.clear();
    }
}

/// Immutable snapshot of session state
///
/// Used for reads without holding locks.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub state: AssistantState,
    pub pending_transcript: String,
    pub error: Option<String>,
}

/// Thread-safe shared session state
///
/// Wraps `SessionState` in `Arc<RwLock<>>` for safe concurrent access.
#[derive(Clone)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
}

impl Default for SharedSessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new())),
        }
    }

    /// Get a read lock on the state
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, SessionState> {
        self.inner.read()
    }

    /// Get a write lock on the state
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SessionState> {
        self.inner.write()
    }

    /// Get a snapshot of current state (no lock held after return)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    // === Convenience read methods ===

    pub fn state(&self) -> AssistantState {
        self.inner.read().state
    }

    pub fn is_idle(&self) -> bool {
        self.inner.read().state.is_idle()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.read().state.is_listening()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.read().state.is_processing()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.read().state.is_speaking()
    }

    pub fn pending_transcript(&self) -> String {
        self.inner.read().pending_transcript.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }
}

/// Commands that control the session
///
/// These are processed by the controller and result in state changes.
#[derive(Clone, Debug)]
pub enum SessionCommand {
    /// Start microphone capture
    StartCapture,
    /// Stop capture; submits the pending transcript if non-empty
    StopCapture,
    /// One-gesture microphone button: start, stop, or silence depending on state
    ToggleMicrophone,
    /// Submit typed text
    SubmitText(String),
    /// Stop speech output
    Stop,
    /// Shut the session down
    Shutdown,
}

/// Events emitted by the session
///
/// These drive UI updates. State should be queried directly from
/// `SharedSessionState` rather than reconstructed from events.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// State has changed (trigger a repaint)
    StateChanged,
    /// The pending transcript changed while Listening
    TranscriptUpdated(String),
    /// A message was appended to the log
    MessageAppended(Message),
    /// Transient informational notice (toast)
    Notice(String),
    /// Transient error notice
    Error(String),
    /// Shutdown complete
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let state = SessionState::new();
        assert!(state.state.is_idle());
        assert!(state.pending_transcript.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_listening_transitions() {
        let mut state = SessionState::new();

        state.start_listening();
        assert!(state.state.is_listening());

        state.update_transcript("hello".to_string());
        assert_eq!(state.pending_transcript, "hello");

        let latched = state.take_transcript();
        state.begin_processing();
        assert_eq!(latched, "hello");
        assert!(state.state.is_processing());
        assert!(state.pending_transcript.is_empty());
    }

    #[test]
    fn test_transcript_replaced_not_appended() {
        let mut state = SessionState::new();
        state.start_listening();
        state.update_transcript("hel".to_string());
        state.update_transcript("hello world".to_string());
        assert_eq!(state.pending_transcript, "hello world");
    }

    #[test]
    fn test_return_to_idle_clears_transcript() {
        let mut state = SessionState::new();
        state.start_listening();
        state.update_transcript("leftover".to_string());
        state.return_to_idle();
        assert!(state.state.is_idle());
        assert!(state.pending_transcript.is_empty());
    }

    #[test]
    fn test_start_listening_clears_error() {
        let mut state = SessionState::new();
        state.set_error("boom".to_string());
        state.start_listening();
        assert!(state.error.is_none());
    }

    #[test]
    fn test_speaking_transitions() {
        let mut state = SessionState::new();
        state.begin_processing();
        state.begin_speaking();
        assert!(state.state.is_speaking());
        state.return_to_idle();
        assert!(state.state.is_idle());
    }

    #[test]
    fn test_shared_state() {
        let shared = SharedSessionState::new();
        assert!(shared.is_idle());

        {
            shared.write().start_listening();
        }
        assert!(shared.is_listening());

        let snapshot = shared.snapshot();
        assert!(snapshot.state.is_listening());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let shared = SharedSessionState::new();

        let snapshot1 = shared.snapshot();
        assert!(snapshot1.state.is_idle());

        {
            shared.write().start_listening();
        }

        // snapshot1 still shows idle
        assert!(snapshot1.state.is_idle());

        let snapshot2 = shared.snapshot();
        assert!(snapshot2.state.is_listening());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AssistantState::Idle.to_string(), "Idle");
        assert_eq!(AssistantState::Listening.to_string(), "Listening");
        assert_eq!(AssistantState::Processing.to_string(), "Processing");
        assert_eq!(AssistantState::Speaking.to_string(), "Speaking");
    }

    #[test]
    fn test_is_busy() {
        assert!(!AssistantState::Idle.is_busy());
        assert!(AssistantState::Listening.is_busy());
        assert!(AssistantState::Processing.is_busy());
        assert!(AssistantState::Speaking.is_busy());
    }
}
