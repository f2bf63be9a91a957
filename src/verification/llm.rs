use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Maximum retries exceeded: {0}")]
    MaxRetriesExceeded(String),
}

/// Classified shape of a generateContent response before any free-text
/// parsing happens. The distinction between `NoCandidates` and `EmptyText`
/// is visible to clients through different explanation strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmOutcome {
    Text(String),
    Blocked { reason: String },
    NoCandidates,
    EmptyText,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.gemini_api_base.trim_end_matches('/'),
            config.gemini_model
        );

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            url,
            api_key: config.gemini_api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Sends a single-turn prompt and classifies the response. Transport
    /// errors and non-2xx statuses are retried with capped exponential
    /// backoff before giving up.
    pub async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<LlmOutcome, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let mut attempt = 0;
        let mut delay = Duration::from_millis(1000);

        loop {
            match self.call_api(&request).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    attempt += 1;

                    if attempt >= self.max_retries {
                        warn!("Max retries exceeded for Gemini call: {}", e);
                        return Err(LlmError::MaxRetriesExceeded(e.to_string()));
                    }

                    warn!(
                        "Gemini call failed (attempt {}): {}. Retrying in {:?}",
                        attempt, e, delay
                    );
                    sleep(delay).await;

                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
            }
        }
    }

    async fn call_api(&self, request: &GenerateRequest) -> Result<LlmOutcome, LlmError> {
        debug!("Sending request to Gemini API: {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {status}: {error_text}")));
        }

        let completion: GenerateResponse = response.json().await?;

        Ok(classify_response(completion))
    }
}

/// Maps the raw wire response onto the outcome lattice: safety blocks first,
/// then missing candidates, then empty text.
fn classify_response(response: GenerateResponse) -> LlmOutcome {
    if response.candidates.is_empty() {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return LlmOutcome::Blocked { reason };
        }
        return LlmOutcome::NoCandidates;
    }

    let candidate = &response.candidates[0];

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return LlmOutcome::Blocked {
            reason: "SAFETY".to_string(),
        };
    }

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        LlmOutcome::EmptyText
    } else {
        LlmOutcome::Text(text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,

    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,

    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(base: String) -> GeminiClient {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 10000,
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: base,
            gemini_model: "gemini-test".to_string(),
            deepfake_model_path: "/nonexistent/model.onnx".to_string(),
            request_timeout_seconds: 5,
            max_retries: 1,
            max_upload_bytes: 16 * 1024 * 1024,
            max_paper_chars: 30_000,
        };
        GeminiClient::new(&config).unwrap()
    }

    fn classify(body: serde_json::Value) -> LlmOutcome {
        let response: GenerateResponse = serde_json::from_value(body).unwrap();
        classify_response(response)
    }

    #[test]
    fn test_classify_text_response() {
        let outcome = classify(json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Truth Score: 90\n"}, {"text": "Explanation: ok"}]
                    }
                }
            ]
        }));

        assert_eq!(
            outcome,
            LlmOutcome::Text("Truth Score: 90\nExplanation: ok".to_string())
        );
    }

    #[test]
    fn test_classify_blocked_prompt() {
        let outcome = classify(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));

        assert_eq!(
            outcome,
            LlmOutcome::Blocked {
                reason: "SAFETY".to_string()
            }
        );
    }

    #[test]
    fn test_classify_blocked_candidate() {
        let outcome = classify(json!({
            "candidates": [
                {"content": {"parts": []}, "finishReason": "SAFETY"}
            ]
        }));

        assert!(matches!(outcome, LlmOutcome::Blocked { .. }));
    }

    #[test]
    fn test_classify_no_candidates() {
        let outcome = classify(json!({"candidates": []}));
        assert_eq!(outcome, LlmOutcome::NoCandidates);
    }

    #[test]
    fn test_classify_whitespace_only_text() {
        let outcome = classify(json!({
            "candidates": [
                {"content": {"parts": [{"text": "   \n  "}]}}
            ]
        }));

        assert_eq!(outcome, LlmOutcome::EmptyText);
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn test_generate_parses_successful_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent")
                .query_param("key", "test-key");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "candidates": [
                        {
                            "content": {
                                "role": "model",
                                "parts": [{"text": "Truth Score: 90"}]
                            }
                        }
                    ]
                }));
        });

        let client = test_client(server.base_url());
        let outcome = client.generate("prompt", 0.2).await.unwrap();

        assert_eq!(outcome, LlmOutcome::Text("Truth Score: 90".to_string()));
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn test_generate_gives_up_after_retries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent");
            then.status(500);
        });

        let client = test_client(server.base_url());
        let err = client.generate("prompt", 0.2).await.unwrap_err();

        assert!(matches!(err, LlmError::MaxRetriesExceeded(_)));
        mock.assert();
    }
}
