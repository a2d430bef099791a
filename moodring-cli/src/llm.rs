//! OpenAI-compatible chat completions, prompted with the active mood's persona.

use anyhow::Context;
use moodring_core::MoodType;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::OpenAiConfig;

pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Prior turns sent along with each request.
pub const MAX_CONTEXT_TURNS: usize = 20;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Unknown(String),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Map a non-success HTTP status to the error the user sees.
pub fn error_for_status(status: StatusCode, body: &str) -> ChatError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };
    match status.as_u16() {
        401 | 403 => ChatError::Auth(format!("check the API key ({detail})")),
        429 => ChatError::RateLimit(format!("too many requests, try again later ({detail})")),
        s if s >= 500 => ChatError::Network(format!("server error ({detail})")),
        _ => ChatError::Unknown(format!("request failed ({detail})")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Conversation state for an interactive chat. The system prompt follows the mood.
#[derive(Debug, Clone)]
pub struct ChatSession {
    mood: MoodType,
    history: VecDeque<ChatTurn>,
}

impl ChatSession {
    pub fn new(mood: MoodType) -> Self {
        Self {
            mood,
            history: VecDeque::new(),
        }
    }

    pub fn mood(&self) -> MoodType {
        self.mood
    }

    pub fn history(&self) -> &VecDeque<ChatTurn> {
        &self.history
    }

    /// Switch persona. Returns true when the mood actually changed.
    pub fn set_mood(&mut self, mood: MoodType) -> bool {
        let changed = mood != self.mood;
        self.mood = mood;
        changed
    }

    /// Validate user input. `Ok(None)` means there is nothing to send.
    pub fn prepare(&self, input: &str) -> ChatResult<Option<String>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if input.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::Unknown(format!(
                "message is too long (max {MAX_MESSAGE_CHARS} characters)"
            )));
        }
        Ok(Some(trimmed.to_string()))
    }

    /// System persona, recent history, then the new user message.
    pub fn request_turns(&self, user: &str) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(self.history.len() + 2);
        turns.push(ChatTurn::new("system", self.mood.profile().persona));
        let skip = self.history.len().saturating_sub(MAX_CONTEXT_TURNS);
        turns.extend(self.history.iter().skip(skip).cloned());
        turns.push(ChatTurn::new("user", user));
        turns
    }

    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.history.push_back(ChatTurn::new("user", user));
        self.history.push_back(ChatTurn::new("assistant", assistant));
        while self.history.len() > MAX_CONTEXT_TURNS {
            self.history.pop_front();
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pull the assistant text out of a response body.
pub fn extract_reply(body: &str) -> ChatResult<String> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| ChatError::InvalidResponse(format!("unparseable body: {e}")))?;
    let message = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| ChatError::InvalidResponse("no choices in response".to_string()))?;
    let content = message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ChatError::InvalidResponse("empty reply".to_string()));
    }
    Ok(content.trim().to_string())
}

/// Blocking entry point usable from inside or outside a tokio runtime.
pub fn chat_complete(config: &OpenAiConfig, turns: &[ChatTurn]) -> anyhow::Result<String> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        Ok(tokio::task::block_in_place(|| handle.block_on(chat_complete_async(config, turns)))?)
    } else {
        let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
        Ok(rt.block_on(chat_complete_async(config, turns))?)
    }
}

pub async fn chat_complete_async(config: &OpenAiConfig, turns: &[ChatTurn]) -> ChatResult<String> {
    config.validate().map_err(|e| ChatError::Config(e.to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ChatError::Config(e.to_string()))?;

    let body = CompletionRequest {
        model: &config.model,
        messages: turns,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    debug!(model = %config.model, turns = turns.len(), "sending chat completion");
    let resp = client
        .post(config.completions_url())
        .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
        .header(CONTENT_TYPE, "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout(format!("no reply within {}s", config.timeout.as_secs()))
            } else {
                ChatError::Network(e.to_string())
            }
        })?;

    let status = resp.status();
    let text = resp.text().await.map_err(|e| ChatError::Network(e.to_string()))?;
    if !status.is_success() {
        let err = error_for_status(status, &text);
        error!(error = %err, "chat completion failed");
        return Err(err);
    }
    extract_reply(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(error_for_status(StatusCode::UNAUTHORIZED, ""), ChatError::Auth(_)));
        assert!(matches!(error_for_status(StatusCode::FORBIDDEN, "nope"), ChatError::Auth(_)));
        assert!(matches!(error_for_status(StatusCode::TOO_MANY_REQUESTS, ""), ChatError::RateLimit(_)));
        assert!(matches!(error_for_status(StatusCode::BAD_GATEWAY, ""), ChatError::Network(_)));
        assert!(matches!(error_for_status(StatusCode::NOT_FOUND, ""), ChatError::Unknown(_)));
    }

    #[test]
    fn reply_extraction() {
        let ok = r#"{"choices":[{"message":{"role":"assistant","content":"  breathe  "}}]}"#;
        assert_eq!(extract_reply(ok).unwrap(), "breathe");

        for bad in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
            r#"{"choices":[{}]}"#,
            "<html>",
        ] {
            assert!(matches!(extract_reply(bad), Err(ChatError::InvalidResponse(_))), "{bad}");
        }
    }

    #[test]
    fn input_limits() {
        let s = ChatSession::new(MoodType::Calm);
        assert_eq!(s.prepare("   ").unwrap(), None);
        assert_eq!(s.prepare(" hi ").unwrap().as_deref(), Some("hi"));
        assert!(s.prepare(&"字".repeat(MAX_MESSAGE_CHARS)).unwrap().is_some());
        assert!(s.prepare(&"a".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }

    #[test]
    fn persona_leads_and_history_is_bounded() {
        let mut s = ChatSession::new(MoodType::Tension);
        for i in 0..15 {
            s.record_exchange(&format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(s.history().len(), MAX_CONTEXT_TURNS);

        let turns = s.request_turns("now");
        assert_eq!(turns.len(), MAX_CONTEXT_TURNS + 2);
        assert_eq!(turns[0].role, "system");
        assert_eq!(turns[0].content, MoodType::Tension.profile().persona);
        assert_eq!(turns[1].content, "q5");
        assert_eq!(turns.last().map(|t| t.content.as_str()), Some("now"));

        assert!(s.set_mood(MoodType::VeryCalm));
        assert!(!s.set_mood(MoodType::VeryCalm));
        assert_eq!(s.request_turns("x")[0].content, MoodType::VeryCalm.profile().persona);
    }
}
