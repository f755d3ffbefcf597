use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::ChatMessage;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors raised while talking to the chat-completions API
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to reach the API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("malformed API response: {0}")]
    Malformed(String),
    #[error("API response contained no message content")]
    EmptyResponse,
}

/// Configuration for the chat-completions client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key (from OPENAI_API_KEY env var)
    pub api_key: String,
    /// Base URL of an OpenAI-compatible endpoint, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key, base_url))
    }

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Sampling parameters for a single request
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChatParams {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatParams {
    pub fn new(temperature: f64, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }
}

/// Client for OpenAI-compatible chat-completions endpoints
pub struct ChatClient {
    client: Client,
    config: ClientConfig,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Send a conversation and return the first choice's text
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: ChatParams,
    ) -> Result<String, LlmError> {
        let request = ChatRequest::new(model, messages, params, false);
        debug!(
            "POST chat/completions model={} messages={} chars={}",
            model,
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let response = self.post_chat(&request).await?;
        let body = response.text().await?;
        let response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Malformed(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }

    /// Send a conversation with streaming enabled
    ///
    /// `on_delta` sees every content fragment as it arrives. The full text is
    /// returned once the server sends `[DONE]` or closes the stream.
    pub async fn chat_stream<F>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: ChatParams,
        mut on_delta: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str),
    {
        let request = ChatRequest::new(model, messages, params, true);
        let mut response = self.post_chat(&request).await?;

        let mut text = String::new();
        let mut buffer: Vec<u8> = Vec::new();

        'stream: while let Some(chunk) = response.chunk().await? {
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(&line)? {
                    SseEvent::Delta(delta) => {
                        on_delta(&delta);
                        text.push_str(&delta);
                    }
                    SseEvent::Done => {
                        buffer.clear();
                        break 'stream;
                    }
                    SseEvent::Skip => {}
                }
            }
        }

        // a final event may arrive without its trailing newline
        if let SseEvent::Delta(delta) = parse_sse_line(&String::from_utf8_lossy(&buffer))? {
            on_delta(&delta);
            text.push_str(&delta);
        }

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    /// List the model ids the endpoint serves
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        let models: ModelList =
            serde_json::from_str(&body).map_err(|e| LlmError::Malformed(e.to_string()))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api { status, body })
}

/// One parsed server-sent-events line
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseEvent, LlmError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| LlmError::Malformed(e.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .map(SseEvent::Delta)
        .unwrap_or(SseEvent::Skip))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [ChatMessage], params: ChatParams, stream: bool) -> Self {
        Self {
            model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
