// session.rs -- Per-generator client session: API key, mock switch, selected model.

use secrecy::{ExposeSecret, SecretString};
use skugen_types::ModelEndpoint;

use crate::catalog_data::ModelRegistry;
use crate::settings::Settings;

/// Values that look like a key but are known stand-ins.
const PLACEHOLDER_KEYS: &[&str] = &["dummy_key", "your_api_key_here", "sk-xxx", "changeme"];

/// Credentials and model choice for one generator.
///
/// Owned by exactly one [`crate::Generator`]; changed only through the explicit
/// setters below and never written to disk.
pub struct ClientSession {
    api_key: Option<SecretString>,
    use_mock: bool,
    endpoint: ModelEndpoint,
}

impl ClientSession {
    pub fn new(api_key: Option<SecretString>, use_mock: bool, endpoint: ModelEndpoint) -> Self {
        Self {
            api_key,
            use_mock,
            endpoint,
        }
    }

    /// Session for the configured key, mock switch and default model.
    ///
    /// Takes the key out of `settings`; nothing else is consumed.
    pub fn from_settings(settings: &mut Settings, registry: &ModelRegistry) -> Self {
        Self::new(
            settings.api_key.take(),
            settings.use_mock,
            registry.lookup(&settings.default_model),
        )
    }

    /// A session that never touches the network.
    pub fn mock() -> Self {
        Self::new(None, true, ModelRegistry::builtin().default_endpoint())
    }

    /// Rotate the API key.
    pub fn set_api_key(&mut self, api_key: SecretString) {
        self.api_key = Some(api_key);
    }

    pub fn clear_api_key(&mut self) {
        self.api_key = None;
    }

    pub fn set_use_mock(&mut self, use_mock: bool) {
        self.use_mock = use_mock;
    }

    /// Switch model by display name or identifier. Unknown names select the
    /// registry default. Returns the endpoint now in use.
    pub fn select_model(&mut self, registry: &ModelRegistry, name: &str) -> &ModelEndpoint {
        self.endpoint = registry.lookup(name);
        tracing::debug!(
            model = %self.endpoint.display_name,
            identifier = %self.endpoint.model_identifier,
            "model selected"
        );
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: ModelEndpoint) {
        self.endpoint = endpoint;
    }

    pub fn endpoint(&self) -> &ModelEndpoint {
        &self.endpoint
    }

    pub fn use_mock(&self) -> bool {
        self.use_mock
    }

    /// `true` if a key is set and is not blank or a known placeholder.
    pub fn has_usable_key(&self) -> bool {
        self.usable_key().is_some()
    }

    /// The key, if usable. Only the transport should need this.
    pub(crate) fn usable_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|key| {
            let raw = key.expose_secret().trim();
            !raw.is_empty() && !PLACEHOLDER_KEYS.iter().any(|p| p.eq_ignore_ascii_case(raw))
        })
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("use_mock", &self.use_mock)
            .field("endpoint", &self.endpoint.display_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> SecretString {
        SecretString::from(raw.to_string())
    }

    fn session(api_key: Option<&str>) -> ClientSession {
        ClientSession::new(
            api_key.map(key),
            false,
            ModelRegistry::builtin().default_endpoint(),
        )
    }

    #[test]
    fn test_real_key_is_usable() {
        assert!(session(Some("sk-live-1234")).has_usable_key());
    }

    #[test]
    fn test_missing_blank_and_placeholder_keys_are_not_usable() {
        assert!(!session(None).has_usable_key());
        assert!(!session(Some("   ")).has_usable_key());
        assert!(!session(Some("dummy_key")).has_usable_key());
        assert!(!session(Some("YOUR_API_KEY_HERE")).has_usable_key());
    }

    #[test]
    fn test_key_rotation_and_clear() {
        let mut s = session(None);
        s.set_api_key(key("sk-new"));
        assert!(s.has_usable_key());
        s.clear_api_key();
        assert!(!s.has_usable_key());
    }

    #[test]
    fn test_select_model_switches_endpoint() {
        let registry = ModelRegistry::builtin();
        let mut s = session(None);
        let endpoint = s.select_model(&registry, "DeepSeek-R1");
        assert_eq!(endpoint.model_identifier, "deepseek-reasoner");
        assert_eq!(s.endpoint().display_name, "DeepSeek-R1");
    }

    #[test]
    fn test_set_endpoint_accepts_unlisted_endpoint() {
        let mut s = session(Some("sk-live-1234"));
        s.set_endpoint(ModelEndpoint {
            display_name: "Local".into(),
            model_identifier: "qwen2.5".into(),
            url: "http://127.0.0.1:8000/v1/chat/completions".into(),
            description: String::new(),
        });
        assert_eq!(s.endpoint().model_identifier, "qwen2.5");
        assert!(s.has_usable_key());
    }

    #[test]
    fn test_debug_redacts_key() {
        let s = session(Some("sk-super-secret"));
        let debug = format!("{s:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_settings_takes_key_and_model() {
        let mut settings = Settings {
            api_key: Some(key("sk-from-settings")),
            default_model: "deepseek-reasoner".into(),
            ..Default::default()
        };
        let s = ClientSession::from_settings(&mut settings, &ModelRegistry::builtin());
        assert!(s.has_usable_key());
        assert!(!s.use_mock());
        assert_eq!(s.endpoint().display_name, "DeepSeek-R1");
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_mock_session() {
        let s = ClientSession::mock();
        assert!(s.use_mock());
        assert!(!s.has_usable_key());
    }
}
