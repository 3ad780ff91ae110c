//! Session controller: the assistant interaction state machine
//!
//! Arbitrates between microphone capture, typed input, the remote completion
//! call, and speech output so that at most one of {recording, request in
//! flight, speaking} is ever active.

mod controller;

pub use controller::{SessionController, SessionHandle};

use crate::speech::SpeakOptions;
use std::time::Duration;

/// Default greeting seeded into the message log at session start
pub const DEFAULT_GREETING: &str =
    "Hello, I'm your personal assistant. How can I help you today?";

/// Platform capabilities, probed once at session construction
///
/// All later logic branches on this set instead of re-sniffing features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Speech capture (microphone + recognition) is available
    pub has_capture: bool,
    /// Speech synthesis output is available
    pub has_output: bool,
}

/// Configuration for the session controller
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Buffer size for the command and event channels
    pub channel_buffer_size: usize,
    /// Bound on Processing: how long to wait for the completion to resolve
    pub response_timeout: Duration,
    /// How long to wait for worker shutdown confirmation
    pub shutdown_timeout: Duration,
    /// Assistant message appended to the log at session start, if any
    pub greeting: Option<String>,
    /// Voice name fragments tried in order when speaking
    pub preferred_voices: Vec<String>,
    /// Prosody for spoken replies
    pub speak_options: SpeakOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 64,
            response_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            greeting: Some(DEFAULT_GREETING.to_string()),
            preferred_voices: vec!["Google".to_string(), "Daniel".to_string()],
            speak_options: SpeakOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    pub fn with_preferred_voices(mut self, voices: Vec<String>) -> Self {
        self.preferred_voices = voices;
        self
    }

    pub fn with_speak_options(mut self, options: SpeakOptions) -> Self {
        self.speak_options = options;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.response_timeout, Duration::from_secs(30));
        assert_eq!(config.channel_buffer_size, 64);
        assert!(config.greeting.is_some());
        assert_eq!(config.preferred_voices, vec!["Google", "Daniel"]);
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new()
            .with_response_timeout(Duration::from_secs(5))
            .without_greeting()
            .with_preferred_voices(vec!["Samantha".to_string()]);

        assert_eq!(config.response_timeout, Duration::from_secs(5));
        assert!(config.greeting.is_none());
        assert_eq!(config.preferred_voices, vec!["Samantha"]);
    }
}
