// settings.rs -- Process configuration: credentials, limits, timeouts, sampling.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use skugen_types::{GenerationLimits, GenerationParams, RetryPolicy, TransportTimeout};

use crate::catalog_data::{DEFAULT_MODEL, ModelRegistry};
use skugen_types::Error;

/// Every tunable a [`crate::Generator`] reads.
///
/// Build with `Settings::default()` plus struct update syntax, or
/// `Settings::from_env()` for the environment-variable convention.
#[derive(Debug)]
pub struct Settings {
    /// Key for the chat-completion endpoint. Absent keys force mock mode or fail.
    pub api_key: Option<SecretString>,
    /// Serve deterministic mock rows instead of calling the model.
    pub use_mock: bool,
    /// Display name or identifier looked up in the registry.
    pub default_model: String,
    pub limits: GenerationLimits,
    pub params: GenerationParams,
    pub timeout: TransportTimeout,
    pub retry: RetryPolicy,
    /// Wall-clock ceiling in seconds for one top-level generation, corrections included.
    pub total_timeout: Option<f64>,
    /// Request a token stream (true) or a single response body (false).
    pub streaming: bool,
    /// Optional JSON file of extra endpoints merged into the built-in catalog.
    pub catalog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            use_mock: false,
            default_model: DEFAULT_MODEL.to_string(),
            limits: GenerationLimits::default(),
            params: GenerationParams::default(),
            timeout: TransportTimeout::default(),
            retry: RetryPolicy::default(),
            total_timeout: None,
            streaming: true,
            catalog_path: None,
        }
    }
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// - `SKUGEN_API_KEY` (fallback: `DEEPSEEK_API_KEY`): endpoint key
    /// - `SKUGEN_USE_MOCK`: `1`, `true` or `yes` enables mock mode
    /// - `SKUGEN_MODEL`: default model name
    /// - `SKUGEN_MAX_ROWS`, `SKUGEN_MAX_CORRECTION_ROUNDS`: limits
    /// - `SKUGEN_TEMPERATURE`, `SKUGEN_MAX_TOKENS`: sampling
    /// - `SKUGEN_CONNECT_TIMEOUT`, `SKUGEN_REQUEST_TIMEOUT`,
    ///   `SKUGEN_STREAM_READ_TIMEOUT`, `SKUGEN_TOTAL_TIMEOUT`: seconds
    /// - `SKUGEN_STREAMING`: `0`, `false` or `no` disables streaming
    /// - `SKUGEN_CATALOG`: path to an extra endpoint catalog
    ///
    /// Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var("SKUGEN_API_KEY")
            .or_else(|_| std::env::var("DEEPSEEK_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        Self {
            api_key,
            use_mock: env_flag("SKUGEN_USE_MOCK").unwrap_or(defaults.use_mock),
            default_model: std::env::var("SKUGEN_MODEL").unwrap_or(defaults.default_model),
            limits: GenerationLimits {
                max_rows: env_parse("SKUGEN_MAX_ROWS")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(defaults.limits.max_rows),
                max_correction_rounds: env_parse("SKUGEN_MAX_CORRECTION_ROUNDS")
                    .unwrap_or(defaults.limits.max_correction_rounds),
            },
            params: GenerationParams {
                temperature: env_parse("SKUGEN_TEMPERATURE")
                    .unwrap_or(defaults.params.temperature),
                max_tokens: env_parse("SKUGEN_MAX_TOKENS").unwrap_or(defaults.params.max_tokens),
                top_p: defaults.params.top_p,
            },
            timeout: TransportTimeout {
                connect: env_secs("SKUGEN_CONNECT_TIMEOUT").unwrap_or(defaults.timeout.connect),
                request: env_secs("SKUGEN_REQUEST_TIMEOUT").unwrap_or(defaults.timeout.request),
                stream_read: env_secs("SKUGEN_STREAM_READ_TIMEOUT")
                    .unwrap_or(defaults.timeout.stream_read),
            },
            retry: defaults.retry,
            total_timeout: env_secs("SKUGEN_TOTAL_TIMEOUT"),
            streaming: env_flag("SKUGEN_STREAMING").unwrap_or(defaults.streaming),
            catalog_path: std::env::var_os("SKUGEN_CATALOG").map(PathBuf::from),
        }
    }

    /// Built-in registry plus `catalog_path`, with `default_model` as the fallback entry.
    pub fn registry(&self) -> Result<ModelRegistry, Error> {
        let mut registry = ModelRegistry::builtin();
        if let Some(path) = &self.catalog_path {
            let json = std::fs::read_to_string(path).map_err(|e| {
                Error::configuration(format!(
                    "Failed to read model catalog {}: {e}",
                    path.display()
                ))
            })?;
            registry.merge_json(&json)?;
        }
        if registry.get(&self.default_model).is_some() {
            registry.set_default(&self.default_model)?;
        } else {
            tracing::warn!(
                model = %self.default_model,
                "configured default model is not in the catalog; keeping {}",
                DEFAULT_MODEL
            );
        }
        Ok(registry)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Non-negative, finite seconds.
fn env_secs(name: &str) -> Option<f64> {
    env_parse::<f64>(name).filter(|s| s.is_finite() && *s > 0.0)
}

/// A configured number of seconds as a `Duration`. Negative, zero and
/// non-finite values are configuration errors.
pub(crate) fn positive_secs(what: &str, secs: f64) -> Result<Duration, Error> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs)
            .map_err(|e| Error::configuration(format!("{what} of {secs}s is out of range: {e}")))
    } else {
        Err(Error::configuration(format!(
            "{what} must be a positive number of seconds, got {secs}"
        )))
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
