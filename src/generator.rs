use crate::error::Result;
use crate::prompt::{compose_prompt, PromptStyle};
use crate::store::SearchResult;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generated text plus the total token usage the service reported.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub total_tokens: u32,
}

pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<Answer>;
}

/// Answers `query` from `results` with a single user message.
pub fn generate_answer<C: ChatModel + ?Sized>(
    chat: &C,
    query: &str,
    results: &[SearchResult],
    style: PromptStyle,
    max_tokens: u32,
) -> Result<Answer> {
    let prompt = compose_prompt(style, query, results);
    log::debug!(
        "Generating answer with {} (style={}, {} context chunks)",
        chat.model(),
        style,
        results.len()
    );
    let answer = chat.complete(&[ChatMessage::user(prompt)], max_tokens)?;
    log::debug!("Answer used {} tokens", answer.total_tokens);
    Ok(answer)
}
