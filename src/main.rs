//! Prattle - text-mode front end
//!
//! Runs the session with speech capture and output unavailable, which is
//! exactly the degraded path the session supports: typed input in, text
//! replies out. Set `GEMINI_API_KEY` (and optionally `GEMINI_MODEL`) before
//! running.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use prattle::completion::{CompletionConfig, CompletionWorker, GeminiClient};
use prattle::speech::{CaptureHandle, SynthesisHandle};
use prattle::{Author, SessionConfig, SessionController, SessionEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prattle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Prattle session");

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY is not set; the completion service needs it")?;
    let mut completion_config = CompletionConfig::new(api_key);
    if let Ok(model) = std::env::var("GEMINI_MODEL") {
        completion_config = completion_config.with_model(model);
    }

    let client = GeminiClient::new(completion_config)?;
    let (completion, completion_join) = CompletionWorker::new(client).start()?;

    let (controller, handle) = SessionController::new(
        SessionConfig::default(),
        CaptureHandle::unavailable(),
        SynthesisHandle::unavailable(),
        completion,
    );
    let controller_join = controller.start();

    // Show the greeting and the capture notice queued at construction
    drain_events(&handle);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        handle.submit_text(input)?;

        // Wait for the session to settle back to Idle, printing as we go
        loop {
            match handle.recv_event_timeout(Duration::from_secs(60)) {
                Some(event) => {
                    print_event(&event);
                    if matches!(event, SessionEvent::StateChanged) && handle.state().is_idle() {
                        break;
                    }
                }
                None => {
                    eprintln!("(no response)");
                    break;
                }
            }
        }
    }

    handle.shutdown()?;
    let _ = controller_join.join();
    let _ = completion_join.join();
    Ok(())
}

fn drain_events(handle: &prattle::SessionHandle) {
    while let Some(event) = handle.try_recv_event() {
        print_event(&event);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::MessageAppended(message) => match message.author {
            Author::Assistant => println!("assistant: {}", message.content),
            Author::User => {}
        },
        SessionEvent::Notice(text) => println!("({})", text),
        SessionEvent::Error(text) => eprintln!("error: {}", text),
        _ => {}
    }
}
