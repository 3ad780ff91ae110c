//! Prattle - voice/text chat assistant session core
//!
//! This crate provides the coordination logic for a voice-enabled chat
//! assistant: a finite state machine over {Idle, Listening, Processing,
//! Speaking} arbitrating between microphone capture, typed input, a remote
//! completion call, and spoken replies, so the four channels never corrupt
//! each other's state.

pub mod completion;
pub mod error;
pub mod messages;
pub mod session;
pub mod speech;
pub mod state;

// Re-export error types
pub use error::{PrattleError, Result};

// Re-export the core session surface
pub use messages::{Author, Message, MessageLog};
pub use session::{Capabilities, SessionConfig, SessionController, SessionHandle};
pub use state::{
    AssistantState, SessionCommand, SessionEvent, SessionSnapshot, SessionState,
    SharedSessionState,
};
