//! Error types for the Prattle session core
//!
//! One enum covers every failure the session can see. Variants carry a
//! string payload so errors stay `Clone` and can travel over channels.

use thiserror::Error;

/// Prattle session errors
#[derive(Error, Debug, Clone)]
pub enum PrattleError {
    /// A required platform capability (capture or synthesis) is absent
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Speech capture start/stop or transcript delivery error
    #[error("Speech capture error: {0}")]
    CaptureError(String),

    /// Speech synthesis error
    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    /// Remote completion call failure (network, HTTP, decoding)
    #[error("Completion error: {0}")]
    CompletionError(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PrattleError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors let the session keep running in a degraded mode,
    /// while non-recoverable errors require user intervention or restart.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Missing modality: the session degrades to the remaining one
            PrattleError::CapabilityUnavailable(_) => true,
            // Capture/synthesis errors are typically transient
            PrattleError::CaptureError(_) => true,
            PrattleError::SynthesisError(_) => true,
            // Remote call failures are typically transient
            PrattleError::CompletionError(_) => true,
            // Channel errors indicate internal issues
            PrattleError::ChannelError(_) => false,
            // Config errors require user intervention
            PrattleError::ConfigError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    ///
    /// Returns a message suitable for display as a notification.
    pub fn user_message(&self) -> String {
        match self {
            PrattleError::CapabilityUnavailable(_) => {
                "This feature isn't supported on your device.".to_string()
            }
            PrattleError::CaptureError(_) => {
                "Couldn't start listening. Please try again.".to_string()
            }
            PrattleError::SynthesisError(_) => {
                "Text-to-speech failed. The reply is shown as text.".to_string()
            }
            PrattleError::CompletionError(_) => {
                "Couldn't get a response. Please try again.".to_string()
            }
            PrattleError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            PrattleError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
        }
    }
}

/// Result type alias for Prattle operations
pub type Result<T> = std::result::Result<T, PrattleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(PrattleError::CompletionError("timeout".into()).is_recoverable());
        assert!(PrattleError::CaptureError("busy".into()).is_recoverable());
        assert!(PrattleError::CapabilityUnavailable("no mic".into()).is_recoverable());
        assert!(!PrattleError::ChannelError("closed".into()).is_recoverable());
        assert!(!PrattleError::ConfigError("missing key".into()).is_recoverable());
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = PrattleError::CompletionError("HTTP 500 from upstream".into());
        assert!(!err.user_message().contains("500"));

        let err = PrattleError::CaptureError("device enumeration failed".into());
        assert!(!err.user_message().contains("enumeration"));
    }

    #[test]
    fn test_display_includes_detail() {
        let err = PrattleError::CompletionError("connection refused".into());
        assert_eq!(err.to_string(), "Completion error: connection refused");
    }
}
