use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Type alias for the on_retry callback to reduce complexity.
pub type OnRetryCallback = Arc<dyn Fn(&crate::error::Error, u32, Duration) + Send + Sync>;

/// Retry policy for transient transport failures.
#[derive(Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first (default: 2, i.e. 3 attempts).
    pub max_retries: u32,
    /// Base delay in seconds before first retry (default: 1.0).
    pub base_delay: f64,
    /// Maximum delay in seconds between retries (default: 10.0).
    pub max_delay: f64,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delays (default: true).
    pub jitter: bool,
    /// Upper bound in seconds on the time spent across all attempts (default: 30.0).
    /// A retry whose sleep would cross this bound is not attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elapsed: Option<f64>,
    /// Called before each retry attempt with (error, attempt_number, delay).
    #[serde(skip)]
    pub on_retry: Option<OnRetryCallback>,
}

impl Clone for RetryPolicy {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
            max_elapsed: self.max_elapsed,
            on_retry: self.on_retry.clone(),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("max_elapsed", &self.max_elapsed)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: 1.0,
            max_delay: 10.0,
            backoff_multiplier: 2.0,
            jitter: true,
            max_elapsed: Some(30.0),
            on_retry: None,
        }
    }
}

/// Transport-level timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportTimeout {
    /// Connection timeout (default: 10.0).
    pub connect: f64,
    /// Total timeout for one request attempt (default: 30.0).
    pub request: f64,
    /// Maximum wait for the next streamed chunk (default: 30.0).
    pub stream_read: f64,
}

impl Default for TransportTimeout {
    fn default() -> Self {
        Self {
            connect: 10.0,
            request: 30.0,
            stream_read: 30.0,
        }
    }
}

/// Row-count bounds for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLimits {
    /// Largest row count a single call may request (default: 50).
    pub max_rows: usize,
    /// How many continuation requests may be issued to make up a deficit (default: 3).
    pub max_correction_rounds: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_rows: 50,
            max_correction_rounds: 3,
        }
    }
}

/// Sampling parameters forwarded to the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            top_p: 0.95,
        }
    }
}
