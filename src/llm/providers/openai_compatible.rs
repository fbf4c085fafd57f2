//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Exposes the `complete`/`stream` interface matching the rest of the
//! `LlmProvider` abstraction. All OpenAI wire types are private to this
//! module — callers never see them. Covers OpenAI itself plus compatible
//! local servers (Ollama, LM Studio…), which is how the answering model is
//! typically deployed alongside this tool.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{CompletionStream, ProviderError};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    stream_enabled: bool,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request. `timeout_seconds`
    /// bounds each model call; a timed-out call surfaces as a request error.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        stream_enabled: bool,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key, stream_enabled })
    }

    /// Lightweight reachability probe.
    ///
    /// Sends a HEAD request to the configured endpoint.  Any HTTP response
    /// (including 4xx) means the server is reachable.  Only a transport-level
    /// failure (connection refused, timeout) is treated as unreachable.
    ///
    /// Uses a hard 5-second timeout regardless of the request timeout config.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build ping client: {e}")))?;
        let mut req = client.head(&self.api_base_url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Request(format!("unreachable: {e}")))
    }

    /// Send `content` as the user message and return the complete reply.
    ///
    /// One round-trip only — prompt assembly is the caller's responsibility.
    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        let response = self.send_request(content, false).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");
        if let Some(u) = &parsed.usage {
            debug!(input_tokens = u.prompt_tokens, output_tokens = u.completion_tokens, "llm usage");
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))
    }

    /// Send `content` and return the reply as a stream of text increments.
    ///
    /// With streaming disabled in config this degrades to a single-increment
    /// sequence wrapping [`complete`](Self::complete). Dropping the returned
    /// stream abandons the request.
    pub async fn stream(&self, content: &str) -> Result<CompletionStream, ProviderError> {
        if !self.stream_enabled {
            return Ok(CompletionStream::once(self.complete(content).await?));
        }

        let response = self.send_request(content, true).await?;
        let (tx, stream) = CompletionStream::channel(32);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buf = String::new();
            while let Some(item) = body.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::Request(format!("stream read failed: {e}"))))
                            .await;
                        return;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames: one JSON payload per "data:" line, "[DONE]" last.
                while let Some(pos) = buf.find('\n') {
                    let line = buf[..pos].trim().to_string();
                    buf.drain(..=pos);
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            let delta = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content)
                                .unwrap_or_default();
                            if !delta.is_empty() && tx.send(Ok(delta)).await.is_err() {
                                // Receiver dropped — caller abandoned the request.
                                return;
                            }
                        }
                        Err(e) => trace!(error = %e, payload = %data, "skipping unparseable stream frame"),
                    }
                }
            }
        });

        Ok(stream)
    }

    async fn send_request(&self, content: &str, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: content.to_string(),
            }],
            temperature: Some(self.temperature),
            stream: stream.then_some(true),
        };

        debug!(
            model = %payload.model,
            stream,
            content_len = content.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        check_status(response).await
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env.error.code.map(|v| match v {
            serde_json::Value::String(s) => format!(" [code={s}]"),
            other => format!(" [code={other}]"),
        }).unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_frames_deserialize() {
        let frame = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(frame).expect("parse frame");
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));

        let terminal = r#"{"choices":[{"delta":{}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(terminal).expect("parse terminal frame");
        assert_eq!(chunk.choices[0].delta.content, None);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let p = OpenAiCompatibleProvider::new(
            "http://127.0.0.1:1/v1/chat/completions".into(),
            "test-model".into(),
            0.0,
            1,
            true,
            None,
        )
        .expect("build provider");
        assert!(p.complete("hello").await.is_err());
        assert!(p.stream("hello").await.is_err());
    }
}
