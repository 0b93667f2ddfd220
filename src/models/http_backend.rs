// HTTP inference backend - a model served by a local generation server
//
// The weights are held by an OpenAI-compatible server on this machine
// (llama.cpp server, TGI, vLLM...). Loading checks its health endpoint;
// generation streams SSE chat completions and re-emits the accumulated text.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::handle::{InferenceModel, ModelFactory, PartialSender, Turn};
use crate::config::ModelConfig;
use crate::errors::LoadError;

/// Sampling parameters forwarded to the server untouched
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub top_p: f32,
    pub temperature: f32,
}

/// Builds `HttpInferenceModel`s after checking the server can take the model
pub struct HttpModelFactory {
    client: Client,
    endpoint: String,
    model_name: String,
    sampling: SamplingParams,
}

impl HttpModelFactory {
    pub fn new(endpoint: impl Into<String>, model_name: impl Into<String>, sampling: SamplingParams) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
            sampling,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.name.clone(),
            SamplingParams {
                top_p: config.top_p,
                temperature: config.temperature,
            },
        )
    }
}

#[async_trait]
impl ModelFactory for HttpModelFactory {
    async fn load(&self, model_dir: &Path) -> Result<Arc<dyn InferenceModel>, LoadError> {
        if !model_dir.is_dir() {
            return Err(LoadError::Backend(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }

        let url = format!("{}/health", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::Backend(format!("generation server unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_health(status, &body)?;

        tracing::info!("Generation server healthy at {}", self.endpoint);

        Ok(Arc::new(HttpInferenceModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model_name: self.model_name.clone(),
            sampling: self.sampling,
        }))
    }

    async fn reclaim(&self) {
        unload(&self.client, &self.endpoint).await;
    }
}

/// Map a health check onto load outcomes
fn classify_health(status: StatusCode, body: &str) -> Result<(), LoadError> {
    let lowered = body.to_lowercase();
    if status == StatusCode::SERVICE_UNAVAILABLE || lowered.contains("out of memory") {
        return Err(LoadError::ResourceExhausted(format!("{}: {}", status, body.trim())));
    }
    if !status.is_success() {
        return Err(LoadError::Backend(format!("health check failed: {}: {}", status, body.trim())));
    }
    Ok(())
}

async fn unload(client: &Client, endpoint: &str) {
    let url = format!("{}/unload", endpoint);
    if let Err(e) = client.post(&url).send().await {
        tracing::debug!("Unload request failed (ignored): {}", e);
    }
}

pub struct HttpInferenceModel {
    client: Client,
    endpoint: String,
    model_name: String,
    sampling: SamplingParams,
}

impl HttpInferenceModel {
    fn build_request(&self, query: &str, history: &[Turn]) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: turn.query.clone(),
            });
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: turn.response.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: query.to_string(),
        });

        ChatRequest {
            model: self.model_name.clone(),
            messages,
            top_p: self.sampling.top_p,
            temperature: self.sampling.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl InferenceModel for HttpInferenceModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn stream_chat(&self, query: &str, history: &[Turn], tx: &PartialSender) -> Result<()> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = self.build_request(query, history);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send generation request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Generation request failed\n\nStatus: {}\nBody: {}", status, body);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut accumulated = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.context("Generation stream interrupted")?;
            buffer.extend_from_slice(&bytes);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);

                match parse_sse_line(&line)? {
                    SseEvent::Delta(delta) => {
                        accumulated.push_str(&delta);
                        if tx.send(Ok(accumulated.clone())).await.is_err() {
                            // Reader went away
                            return Ok(());
                        }
                    }
                    SseEvent::Done => return Ok(()),
                    SseEvent::Skip => {}
                }
            }
        }

        Ok(())
    }

    async fn release(&self) {
        unload(&self.client, &self.endpoint).await;
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

/// SSE format: "data: {...}\n"
fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let Some(payload) = line.trim_end().strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: ChatChunk =
        serde_json::from_str(payload).context("Malformed generation stream chunk")?;
    if let Some(message) = chunk.error {
        bail!("Generation server error: {}", message);
    }

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();

    if delta.is_empty() {
        Ok(SseEvent::Skip)
    } else {
        Ok(SseEvent::Delta(delta))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    top_p: f32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
