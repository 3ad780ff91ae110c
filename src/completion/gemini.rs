//! Gemini `generateContent` client
//!
//! One HTTP POST per request, no retries and no streaming. The request body
//! is `{"contents":[{"parts":[{"text": …}]}]}` with the API key as a query
//! parameter; the reply text lives at `candidates[0].content.parts[0].text`.
//!
//! A response that arrived but is unusable (non-2xx status, undecodable
//! body, missing text field) maps to a user-safe fallback phrase rather than
//! an error — raw upstream detail must never read like an assistant reply.
//! Transport failures (connect errors, timeouts) are returned as errors so
//! the session can surface a notification instead.

use super::CompletionConfig;
use crate::{PrattleError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fallback reply when the model returns no usable text
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I couldn't generate a response.";

/// Fallback reply when the endpoint answered but the answer is unusable
pub const UNREACHABLE_FALLBACK: &str =
    "I'm having trouble connecting to my brain right now. Please try again in a moment.";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentRequest {
    fn for_text(text: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
        }
    }
}

/// Pull the reply text out of a decoded response, if there is any
fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let text = &response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text;
    if text.is_empty() {
        None
    } else {
        Some(text.clone())
    }
}

/// HTTP client for the Gemini completion endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl GeminiClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            warn!("Gemini API key is empty; requests will be rejected upstream");
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PrattleError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Submit one message and return the reply text
    ///
    /// `Err` means the request never produced a response (transport failure
    /// or timeout); every received response resolves to some text.
    pub async fn complete(&self, text: &str) -> Result<String> {
        debug!("Submitting completion request ({} chars)", text.len());

        let response = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateContentRequest::for_text(text))
            .send()
            .await
            .map_err(|e| PrattleError::CompletionError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Completion endpoint returned HTTP {}", status);
            return Ok(UNREACHABLE_FALLBACK.to_string());
        }

        match response.json::<GenerateContentResponse>().await {
            Ok(body) => Ok(extract_text(&body).unwrap_or_else(|| {
                warn!("Completion response contained no reply text");
                EMPTY_REPLY_FALLBACK.to_string()
            })),
            Err(e) => {
                warn!("Failed to decode completion response: {}", e);
                Ok(UNREACHABLE_FALLBACK.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerateContentRequest::for_text("What's the weather?");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"parts": [{"text": "What's the weather?"}]}]
            })
        );
    }

    #[test]
    fn test_extract_text_happy_path() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hi there"}]}
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert_eq!(extract_text(&response).as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_extract_text_missing_content() {
        let body = serde_json::json!({"candidates": [{}]});
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_extract_text_empty_string() {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}}]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_client_rejects_bad_config_gracefully() {
        // Empty key is allowed (warned, rejected upstream), so construction succeeds
        let client = GeminiClient::new(CompletionConfig::default());
        assert!(client.is_ok());
    }
}
