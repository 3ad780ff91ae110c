//! The session controller event loop
//!
//! One thread owns the state machine and multiplexes four sources with
//! `select!`: front-end commands, capture events, completion events, and
//! synthesis events. Events are processed strictly in arrival order; every
//! transition happens inside this loop, so no other component can put the
//! session into a mixed state.
//!
//! Staleness rules:
//! - the transcript submitted on stop is latched at the stop trigger;
//!   transcript updates outside Listening are dropped
//! - completion events must echo the pending request id; anything else
//!   (late resolution after timeout, duplicate) is ignored
//! - synthesis `Ended` must match the current utterance id while Speaking;
//!   a natural end arriving after cancellation is a no-op

use crate::completion::{CompletionEvent, CompletionHandle};
use crate::messages::{Message, MessageLog};
use crate::speech::{CaptureEvent, CaptureHandle, SynthesisEvent, SynthesisHandle};
use crate::state::{SessionCommand, SessionEvent, SharedSessionState};
use crate::{PrattleError, Result};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Capabilities, SessionConfig};

/// Handle for controlling a running session
///
/// This is the public surface for front ends: send commands, receive events,
/// and query state and messages directly.
pub struct SessionHandle {
    command_tx: Sender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
    state: SharedSessionState,
    log: MessageLog,
    capabilities: Capabilities,
}

impl SessionHandle {
    /// Send a command to the controller
    pub fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| PrattleError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn start_capture(&self) -> Result<()> {
        self.send_command(SessionCommand::StartCapture)
    }

    pub fn stop_capture(&self) -> Result<()> {
        self.send_command(SessionCommand::StopCapture)
    }

    pub fn toggle_microphone(&self) -> Result<()> {
        self.send_command(SessionCommand::ToggleMicrophone)
    }

    pub fn submit_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(SessionCommand::SubmitText(text.into()))
    }

    pub fn stop(&self) -> Result<()> {
        self.send_command(SessionCommand::Stop)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(SessionCommand::Shutdown)
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, blocking until available
    pub fn recv_event(&self) -> Result<SessionEvent> {
        self.event_rx
            .recv()
            .map_err(|e| PrattleError::ChannelError(format!("Failed to receive event: {}", e)))
    }

    /// Receive an event with a timeout
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Shared session state, for direct queries
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    /// The session's message log
    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    /// The capability set probed at construction
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// The assistant interaction state machine
pub struct SessionController {
    config: SessionConfig,
    state: SharedSessionState,
    log: MessageLog,
    capabilities: Capabilities,

    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,

    capture: CaptureHandle,
    synthesis: SynthesisHandle,
    completion: CompletionHandle,

    // In-flight request bookkeeping. The id latched at submission is the
    // only one whose terminal event is honored.
    pending_request: Option<Uuid>,
    processing_deadline: Option<Instant>,
    current_utterance: Option<Uuid>,
    output_notice_sent: bool,
}

impl SessionController {
    /// Create a controller and its handle
    ///
    /// Capabilities are probed here, once, from the supplied handles. The
    /// greeting (if configured) and any capability notice are emitted before
    /// the loop starts so front ends see them first.
    pub fn new(
        config: SessionConfig,
        capture: CaptureHandle,
        synthesis: SynthesisHandle,
        completion: CompletionHandle,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = bounded(config.channel_buffer_size);
        let (event_tx, event_rx) = bounded(config.channel_buffer_size);

        let state = SharedSessionState::new();
        let log = MessageLog::new();
        let capabilities = Capabilities {
            has_capture: capture.is_available(),
            has_output: synthesis.is_available(),
        };

        if let Some(greeting) = &config.greeting {
            let message = Message::assistant(greeting.clone());
            log.append(message.clone());
            let _ = event_tx.send(SessionEvent::MessageAppended(message));
        }

        if !capabilities.has_capture {
            info!("Speech capture unavailable; text input only");
            let _ = event_tx.send(SessionEvent::Notice(
                "Speech capture isn't supported here. You can still type.".to_string(),
            ));
        }

        let handle = SessionHandle {
            command_tx,
            event_rx,
            state: state.clone(),
            log: log.clone(),
            capabilities,
        };

        let controller = Self {
            config,
            state,
            log,
            capabilities,
            command_rx,
            event_tx,
            capture,
            synthesis,
            completion,
            pending_request: None,
            processing_deadline: None,
            current_utterance: None,
            output_notice_sent: false,
        };

        (controller, handle)
    }

    /// Start the controller loop on its own thread
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// The main event loop
    ///
    /// Runs until a Shutdown command arrives or the command channel closes.
    pub fn run(mut self) {
        info!("Session controller loop starting");

        let command_rx = self.command_rx.clone();
        let capture_rx = self.capture.event_receiver();
        let completion_rx = self.completion.event_receiver();
        let synthesis_rx = self.synthesis.event_receiver();

        loop {
            select! {
                recv(command_rx) -> cmd => match cmd {
                    Ok(SessionCommand::Shutdown) => {
                        self.shutdown(&completion_rx);
                        return;
                    }
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        warn!("Command channel disconnected");
                        break;
                    }
                },

                recv(capture_rx) -> event => match event {
                    Ok(event) => self.handle_capture_event(event),
                    Err(_) => warn!("Capture event channel disconnected"),
                },

                recv(completion_rx) -> event => match event {
                    Ok(event) => self.handle_completion_event(event),
                    Err(_) => warn!("Completion event channel disconnected"),
                },

                recv(synthesis_rx) -> event => match event {
                    Ok(event) => self.handle_synthesis_event(event),
                    Err(_) => warn!("Synthesis event channel disconnected"),
                },

                // Timeout so a stuck Processing state is always noticed
                default(Duration::from_millis(10)) => {
                    self.check_response_deadline();
                }
            }
        }

        info!("Session controller loop exiting");
    }

    // === Command handling ===

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::StartCapture => self.start_capture(),
            SessionCommand::StopCapture => self.stop_capture(),
            SessionCommand::ToggleMicrophone => self.toggle_microphone(),
            SessionCommand::SubmitText(text) => self.submit_typed(text),
            SessionCommand::Stop => self.stop_active_output(),
            // Matched in the run loop before dispatch
            SessionCommand::Shutdown => debug!("Shutdown handled by run loop"),
        }
    }

    fn start_capture(&mut self) {
        if !self.state.is_idle() {
            warn!(
                "Cannot start capture in state {}",
                self.state.state()
            );
            return;
        }
        if !self.capabilities.has_capture {
            // The one-time notice went out at construction
            warn!("Start capture refused: capability absent");
            return;
        }

        match self.capture.start() {
            Ok(()) => {
                self.state.write().start_listening();
                self.emit(SessionEvent::StateChanged);
                self.emit(SessionEvent::Notice("I'm listening...".to_string()));
                debug!("Capture started");
            }
            Err(e) => {
                error!("Failed to start capture: {}", e);
                self.emit(SessionEvent::Error(e.user_message()));
            }
        }
    }

    fn stop_capture(&mut self) {
        if !self.state.is_listening() {
            warn!("Cannot stop capture: not listening");
            return;
        }

        if let Err(e) = self.capture.stop() {
            error!("Failed to stop capture: {}", e);
        }
        self.finish_listening();
    }

    /// The original single-button gesture: what it does depends on state
    fn toggle_microphone(&mut self) {
        match self.state.state() {
            s if s.is_idle() => self.start_capture(),
            s if s.is_listening() => self.stop_capture(),
            s if s.is_speaking() => self.stop_active_output(),
            s => debug!("Microphone toggle ignored in state {}", s),
        }
    }

    fn submit_typed(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            debug!("Ignoring empty text submission");
            return;
        }
        if !self.state.is_idle() {
            // Backpressure: one request at a time, no capture interruption
            warn!(
                "Rejecting text submission in state {}",
                self.state.state()
            );
            return;
        }

        self.dispatch_request(text);
    }

    /// Stop whatever output-side activity is running
    fn stop_active_output(&mut self) {
        let state = self.state.state();
        if state.is_speaking() {
            if let Err(e) = self.synthesis.cancel() {
                error!("Failed to cancel speech: {}", e);
            }
            self.current_utterance = None;
            self.state.write().return_to_idle();
            self.emit(SessionEvent::StateChanged);
            debug!("Speech cancelled");
        } else if state.is_listening() {
            // Stop-as-cancel: drop the transcript instead of submitting it
            if let Err(e) = self.capture.stop() {
                error!("Failed to stop capture: {}", e);
            }
            self.state.write().return_to_idle();
            self.emit(SessionEvent::StateChanged);
            debug!("Capture cancelled");
        } else {
            debug!("Stop ignored in state {}", state);
        }
    }

    // === Capture events ===

    fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Transcript(text) => {
                if self.state.is_listening() {
                    self.state.write().update_transcript(text.clone());
                    self.emit(SessionEvent::TranscriptUpdated(text));
                } else {
                    debug!("Dropping transcript update outside Listening");
                }
            }

            CaptureEvent::Ended => {
                if self.state.is_listening() {
                    debug!("Capture ended autonomously");
                    self.finish_listening();
                } else {
                    // Already left Listening (explicit stop or cancel); a
                    // second trigger must not re-submit
                    debug!("Ignoring capture end in state {}", self.state.state());
                }
            }

            CaptureEvent::Error(err) => {
                let e = PrattleError::CaptureError(err);
                error!("{}", e);
                if self.state.is_listening() {
                    {
                        let mut s = self.state.write();
                        s.set_error(e.to_string());
                        s.return_to_idle();
                    }
                    self.emit(SessionEvent::Error(e.user_message()));
                    self.emit(SessionEvent::StateChanged);
                }
            }
        }
    }

    /// Leave Listening: submit the latched transcript if non-empty
    ///
    /// Both the explicit stop and the autonomous end funnel through here;
    /// the caller has checked the state is Listening, so whichever trigger
    /// fires second finds the state changed and never reaches this point.
    fn finish_listening(&mut self) {
        let transcript = self.state.write().take_transcript();
        let text = transcript.trim().to_string();

        if text.is_empty() {
            self.state.write().return_to_idle();
            self.emit(SessionEvent::StateChanged);
            debug!("Capture finished with empty transcript");
        } else {
            self.dispatch_request(text);
        }
    }

    // === Submission ===

    /// Append the user's message and put the request in flight
    ///
    /// The user message lands in the log before the completion resolves, so
    /// the log always reflects what was sent even if the call fails.
    fn dispatch_request(&mut self, text: String) {
        let message = Message::user(text.clone());
        self.log.append(message.clone());
        self.emit(SessionEvent::MessageAppended(message));

        self.state.write().begin_processing();
        self.emit(SessionEvent::StateChanged);

        let request_id = Uuid::new_v4();
        match self.completion.submit(request_id, text) {
            Ok(()) => {
                self.pending_request = Some(request_id);
                self.processing_deadline = Some(Instant::now() + self.config.response_timeout);
                debug!("Request {} dispatched", request_id);
            }
            Err(e) => {
                error!("Failed to dispatch request: {}", e);
                {
                    let mut s = self.state.write();
                    s.set_error(e.to_string());
                    s.return_to_idle();
                }
                self.emit(SessionEvent::Error(e.user_message()));
                self.emit(SessionEvent::StateChanged);
            }
        }
    }

    // === Completion events ===

    fn handle_completion_event(&mut self, event: CompletionEvent) {
        match event {
            CompletionEvent::Resolved { request_id, text } => {
                if !self.is_current_request(request_id) {
                    debug!("Ignoring stale completion {}", request_id);
                    return;
                }
                self.pending_request = None;
                self.processing_deadline = None;

                let message = Message::assistant(text.clone());
                self.log.append(message.clone());
                self.emit(SessionEvent::MessageAppended(message));

                self.speak_reply(text);
            }

            CompletionEvent::Failed { request_id, error } => {
                if !self.is_current_request(request_id) {
                    debug!("Ignoring stale completion failure {}", request_id);
                    return;
                }
                self.pending_request = None;
                self.processing_deadline = None;

                error!("Completion failed: {}", error);
                {
                    let mut s = self.state.write();
                    s.set_error(error.clone());
                    s.return_to_idle();
                }
                self.emit(SessionEvent::Error(
                    PrattleError::CompletionError(error).user_message(),
                ));
                self.emit(SessionEvent::StateChanged);
            }

            CompletionEvent::Shutdown => {
                debug!("Completion worker shut down");
            }
        }
    }

    fn is_current_request(&self, request_id: Uuid) -> bool {
        self.state.is_processing() && self.pending_request == Some(request_id)
    }

    /// Speak an appended reply, or fall through to Idle when output is absent
    fn speak_reply(&mut self, text: String) {
        if !self.capabilities.has_output {
            if !self.output_notice_sent {
                self.output_notice_sent = true;
                self.emit(SessionEvent::Notice(
                    "Speech output isn't supported here. Replies appear as text.".to_string(),
                ));
            }
            self.state.write().return_to_idle();
            self.emit(SessionEvent::StateChanged);
            return;
        }

        let utterance_id = Uuid::new_v4();
        match self.synthesis.speak(
            utterance_id,
            text,
            self.config.speak_options,
            &self.config.preferred_voices,
        ) {
            Ok(()) => {
                self.current_utterance = Some(utterance_id);
                self.state.write().begin_speaking();
                self.emit(SessionEvent::StateChanged);
                debug!("Speaking utterance {}", utterance_id);
            }
            Err(e) => {
                error!("Failed to start speech: {}", e);
                self.emit(SessionEvent::Error(e.user_message()));
                self.state.write().return_to_idle();
                self.emit(SessionEvent::StateChanged);
            }
        }
    }

    // === Synthesis events ===

    fn handle_synthesis_event(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started { utterance_id } => {
                debug!("Synthesis started for {}", utterance_id);
            }

            SynthesisEvent::Ended { utterance_id } => {
                if self.state.is_speaking() && self.current_utterance == Some(utterance_id) {
                    self.current_utterance = None;
                    self.state.write().return_to_idle();
                    self.emit(SessionEvent::StateChanged);
                    debug!("Synthesis ended for {}", utterance_id);
                } else {
                    // Natural end arriving after cancellation, or for an
                    // utterance that was superseded
                    debug!("Ignoring stale synthesis end for {}", utterance_id);
                }
            }
        }
    }

    // === Deadline ===

    /// Bound Processing so an unsettled remote call can never wedge the session
    fn check_response_deadline(&mut self) {
        if !self.state.is_processing() {
            return;
        }
        let Some(deadline) = self.processing_deadline else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }

        warn!(
            "Completion did not resolve within {:?}",
            self.config.response_timeout
        );
        self.pending_request = None;
        self.processing_deadline = None;
        let e = PrattleError::CompletionError("request timed out".to_string());
        {
            let mut s = self.state.write();
            s.set_error(e.to_string());
            s.return_to_idle();
        }
        self.emit(SessionEvent::Error(e.user_message()));
        self.emit(SessionEvent::StateChanged);
    }

    // === Shutdown ===

    fn shutdown(&mut self, completion_rx: &Receiver<CompletionEvent>) {
        info!("Shutdown requested");

        // Release the capture/output channels before tearing down
        if self.state.is_listening() {
            let _ = self.capture.stop();
        }
        if self.state.is_speaking() {
            let _ = self.synthesis.cancel();
        }

        let _ = self.completion.shutdown();

        let deadline = Instant::now() + self.config.shutdown_timeout;
        loop {
            if Instant::now() > deadline {
                warn!("Shutdown timeout reached, forcing exit");
                break;
            }
            match completion_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(CompletionEvent::Shutdown) => {
                    debug!("Completion worker shutdown confirmed");
                    break;
                }
                Ok(_) => {} // drain anything still in flight
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        let _ = self.event_tx.send(SessionEvent::Shutdown);
        info!("Session controller shutdown complete");
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
