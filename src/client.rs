//! Blocking client for an OpenAI-compatible embeddings and chat API.
//!
//! One instance is built from the configuration and handed to everything
//! that needs the service.

use crate::config::{Number, State};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::generator::{Answer, ChatMessage, ChatModel};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 500;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<Number>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    http: Client,
    api_base: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(
        api_base: &str,
        api_key: &str,
        embedding_model: &str,
        chat_model: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        let api_base = api_base.trim_end_matches('/').to_string();
        log::debug!(
            "Service client configured: api_base={}, embedding_model={}, chat_model={}",
            api_base,
            embedding_model,
            chat_model
        );
        Ok(Self {
            http,
            api_base,
            api_key: api_key.to_string(),
            embedding_model: embedding_model.to_string(),
            chat_model: chat_model.to_string(),
            max_retries,
        })
    }

    pub fn from_state(state: &State) -> Result<Self> {
        Self::new(
            &state.api_base,
            state.require_api_key()?,
            &state.embedding_model,
            &state.chat_model,
            state.request_timeout,
            state.max_retries,
        )
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base, path);
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()?;

            let status = response.status();
            if status.is_success() {
                return response.json::<R>().map_err(|e| {
                    RagError::ExternalService(format!("malformed response from {}: {}", url, e))
                });
            }

            if is_retryable(status) && attempt < self.max_retries {
                let delay = backoff_delay(attempt);
                log::warn!(
                    "{} returned {}; retrying in {:?} ({}/{})",
                    url,
                    status,
                    delay,
                    attempt + 1,
                    self.max_retries
                );
                thread::sleep(delay);
                attempt += 1;
                continue;
            }

            let body = response.text().unwrap_or_default();
            return Err(RagError::ExternalService(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(10)))
}

impl Embedder for OpenAiClient {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    fn embed(&self, text: &str) -> Result<Vec<Number>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post_json("embeddings", &request)?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                RagError::ExternalService("embedding response contained no data".to_string())
            })?;
        if embedding.is_empty() {
            return Err(RagError::ExternalService(
                "embedding service returned an empty vector".to_string(),
            ));
        }
        Ok(embedding)
    }
}

impl ChatModel for OpenAiClient {
    fn model(&self) -> &str {
        &self.chat_model
    }

    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<Answer> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            max_tokens,
        };
        let response: ChatResponse = self.post_json("chat/completions", &request)?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let total_tokens = response.usage.map_or(0, |u| u.total_tokens);
        Ok(Answer { text, total_tokens })
    }
}
