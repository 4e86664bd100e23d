// Chat-completion wire types sent to the model endpoint.

use serde::{Deserialize, Serialize};

use crate::config::GenerationParams;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of a `POST` to a chat-completions endpoint.
///
/// `HttpTransport` overrides `stream` to match the method called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Validate that the request has the minimum required fields.
    pub fn validate(&self) -> Result<(), Error> {
        if self.model.trim().is_empty() {
            return Err(Error::configuration("Chat request model must not be empty"));
        }
        if self.messages.is_empty() {
            return Err(Error::configuration(
                "Chat request messages must not be empty",
            ));
        }
        Ok(())
    }

    /// Builder-style setter for model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder-style setter for messages.
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Apply temperature, max_tokens and top_p in one go.
    pub fn params(mut self, params: &GenerationParams) -> Self {
        self.temperature = Some(params.temperature);
        self.max_tokens = Some(params.max_tokens);
        self.top_p = Some(params.top_p);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
