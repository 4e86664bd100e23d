// catalog_data.rs -- Model registry backed by an embedded JSON catalog.

use std::sync::LazyLock;

use skugen_types::{Error, ModelEndpoint};

/// Embedded endpoint catalog JSON, loaded at compile time.
static CATALOG_JSON: &str = include_str!("catalog.json");

/// Parsed built-in catalog, lazily initialized on first access.
static BUILTIN: LazyLock<Vec<ModelEndpoint>> =
    LazyLock::new(|| serde_json::from_str(CATALOG_JSON).expect("catalog.json must be valid JSON"));

/// Display name of the entry returned for unknown model names.
pub const DEFAULT_MODEL: &str = "DeepSeek-V3";

/// Name → endpoint mapping. Never mutated once handed to a session.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    endpoints: Vec<ModelEndpoint>,
    default_name: String,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    /// The embedded catalog with `DeepSeek-V3` as default.
    pub fn builtin() -> Self {
        Self {
            endpoints: BUILTIN.clone(),
            default_name: DEFAULT_MODEL.to_string(),
        }
    }

    /// Merge additional endpoints. Entries whose display name already exists
    /// replace the existing one; new entries are appended.
    pub fn merge(&mut self, endpoints: Vec<ModelEndpoint>) {
        for endpoint in endpoints {
            if let Some(existing) = self
                .endpoints
                .iter_mut()
                .find(|e| e.display_name == endpoint.display_name)
            {
                *existing = endpoint;
            } else {
                self.endpoints.push(endpoint);
            }
        }
    }

    /// Merge endpoints from a JSON array of `ModelEndpoint` objects.
    pub fn merge_json(&mut self, json: &str) -> Result<(), Error> {
        let endpoints: Vec<ModelEndpoint> = serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("Invalid model catalog JSON: {e}")))?;
        self.merge(endpoints);
        Ok(())
    }

    /// Change which entry `lookup` falls back to. Fails if the name is unknown.
    pub fn set_default(&mut self, name: &str) -> Result<(), Error> {
        let endpoint = self
            .get(name)
            .ok_or_else(|| Error::configuration(format!("Unknown model: {name}")))?;
        self.default_name = endpoint.display_name.clone();
        Ok(())
    }

    /// Exact match on display name or model identifier.
    pub fn get(&self, name: &str) -> Option<&ModelEndpoint> {
        self.endpoints.iter().find(|e| e.matches(name))
    }

    /// Like `get`, but unknown names resolve to the default entry.
    pub fn lookup(&self, name: &str) -> ModelEndpoint {
        match self.get(name) {
            Some(endpoint) => endpoint.clone(),
            None => {
                tracing::debug!(model = name, "unknown model, using default endpoint");
                self.default_endpoint()
            }
        }
    }

    pub fn default_endpoint(&self) -> ModelEndpoint {
        self.get(&self.default_name)
            .or_else(|| self.endpoints.first())
            .cloned()
            .unwrap_or_else(|| BUILTIN[0].clone())
    }

    pub fn list(&self) -> &[ModelEndpoint] {
        &self.endpoints
    }
}
