//! Speech collaborators: capture (speech-to-text) and synthesis (text-to-speech)
//!
//! Both sides are specified as channel contracts with a small closed set of
//! tagged events, so the session controller can multiplex them in one select
//! loop. A handle is either backed by a platform implementation (constructed
//! from channel halves) or explicitly unavailable, fixed at session start by
//! the capability probe.

pub mod capture;
pub mod synthesis;

pub use capture::{CaptureCommand, CaptureEvent, CaptureHandle};
pub use synthesis::{
    select_voice, SpeakOptions, SynthesisCommand, SynthesisEvent, SynthesisHandle, Voice,
    VoiceInventory,
};
