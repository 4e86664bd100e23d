use serde::{Deserialize, Serialize};

/// A chat-completion endpoint the generator can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    /// Name shown to users and used for lookup (e.g., "DeepSeek-V3").
    pub display_name: String,
    /// Identifier sent as `model` in the request body (e.g., "deepseek-chat").
    pub model_identifier: String,
    /// Full URL of the chat-completions endpoint.
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl ModelEndpoint {
    /// Returns `true` if `name` matches the display name or the model identifier.
    pub fn matches(&self, name: &str) -> bool {
        self.display_name == name || self.model_identifier == name
    }
}
