// Error taxonomy — one error type shared by every stage of a generation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Discriminator for what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad columns, prompt or row count. The user must fix the input.
    Validation,
    /// Missing or unusable API key, unknown configuration.
    Configuration,
    /// Transport failure: connection errors and non-2xx HTTP statuses.
    Network,
    /// Connection-level timeout (per attempt or per stream chunk).
    RequestTimeout,
    /// Model output did not contain a locatable, valid JSON array.
    Parse,
    /// Rows are structurally invalid or the row count could not be reached.
    Shape,
    /// Cancelled by the caller.
    Abort,
}

impl ErrorKind {
    /// Returns `true` for the kinds that originate in the transport layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Network | Self::RequestTimeout)
    }
}

/// Pipeline stage an error surfaced from. Attached by the generation facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Transport,
    Stream,
    Correction,
    Shape,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "input validation",
            Self::Transport => "transport",
            Self::Stream => "stream reconciliation",
            Self::Correction => "row-count correction",
            Self::Shape => "shape validation",
        };
        f.write_str(name)
    }
}

/// The single error type for the whole workspace.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,

    /// HTTP status for transport failures that reached the server.
    pub status_code: Option<u16>,
    /// Raw response body (HTTP failures) or raw model text (parse failures).
    pub raw_text: Option<String>,
    /// Server-provided `Retry-After`, honoured by the retry loop.
    pub retry_after: Option<Duration>,
    /// Stage annotation added by the generation facade.
    pub stage: Option<Stage>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            source: None,
            status_code: None,
            raw_text: None,
            retry_after: None,
            stage: None,
        }
    }

    /// Construct from a non-2xx HTTP status.
    ///
    /// Only gateway-class statuses (502, 503, 504) are transient; every other
    /// status fails immediately and keeps the raw body for diagnostics.
    pub fn from_http_status(
        status: u16,
        message: impl Into<String>,
        raw_body: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let retryable = matches!(status, 502..=504);
        Self {
            status_code: Some(status),
            raw_text: Some(raw_body.into()),
            retry_after,
            ..Self::new(
                ErrorKind::Network,
                format!("HTTP {status}: {}", message.into()),
                retryable,
            )
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, false)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message, false)
    }

    /// Connection-level failure (refused, reset, DNS). Retryable.
    pub fn network(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(ErrorKind::Network, message, true)
        }
    }

    /// Connection-level timeout. Retryable.
    pub fn timeout(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(ErrorKind::RequestTimeout, message, true)
        }
    }

    /// The overall wall-clock ceiling for a generation elapsed. Not retryable:
    /// the whole budget is already spent.
    pub fn deadline_exceeded(limit: Duration) -> Self {
        Self::new(
            ErrorKind::RequestTimeout,
            format!("generation exceeded its total timeout of {limit:?}"),
            false,
        )
    }

    /// No JSON array could be located or parsed in the model output.
    pub fn parse(reason: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(raw_text.into()),
            ..Self::new(ErrorKind::Parse, reason, false)
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, message, false)
    }

    pub fn abort() -> Self {
        Self::new(ErrorKind::Abort, "generation cancelled", false)
    }

    /// Annotate with the stage that failed. An existing annotation wins so the
    /// innermost stage is reported.
    pub fn in_stage(mut self, stage: Stage) -> Self {
        if self.stage.is_none() {
            self.stage = Some(stage);
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(stage) = self.stage {
            write!(f, "{stage} failed: ")?;
        }
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_statuses_are_retryable() {
        for status in [502, 503, 504] {
            let err = Error::from_http_status(status, "bad gateway", "<html>", None);
            assert_eq!(err.kind, ErrorKind::Network, "status {status}");
            assert!(err.retryable, "status {status}");
        }
    }

    #[test]
    fn test_other_statuses_fail_fast() {
        for status in [400, 401, 403, 404, 429, 500, 501] {
            let err = Error::from_http_status(status, "nope", "{}", None);
            assert!(!err.retryable, "status {status}");
            assert_eq!(err.status_code, Some(status));
        }
    }

    #[test]
    fn test_http_error_keeps_raw_body() {
        let err = Error::from_http_status(401, "Unauthorized", r#"{"error":"bad key"}"#, None);
        assert_eq!(err.raw_text.as_deref(), Some(r#"{"error":"bad key"}"#));
        assert!(err.message.contains("401"));
    }

    #[test]
    fn test_parse_error_carries_raw_text() {
        let err = Error::parse("no JSON array found", "sorry, I can't help");
        assert_eq!(err.kind, ErrorKind::Parse);
        assert!(!err.retryable);
        assert_eq!(err.raw_text.as_deref(), Some("sorry, I can't help"));
    }

    #[test]
    fn test_network_error_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::network("connection failed", inner);
        assert!(err.retryable);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.kind.is_transport_error());
    }

    #[test]
    fn test_in_stage_keeps_innermost() {
        let err = Error::shape("missing column")
            .in_stage(Stage::Shape)
            .in_stage(Stage::Correction);
        assert_eq!(err.stage, Some(Stage::Shape));
    }

    #[test]
    fn test_display_includes_stage() {
        let err = Error::parse("no JSON array found", "").in_stage(Stage::Stream);
        let display = err.to_string();
        assert!(display.starts_with("stream reconciliation failed"));
        assert!(display.contains("Parse"));
        assert!(display.contains("no JSON array found"));
    }

    #[test]
    fn test_deadline_exceeded_is_final() {
        let err = Error::deadline_exceeded(Duration::from_secs(90));
        assert_eq!(err.kind, ErrorKind::RequestTimeout);
        assert!(!err.retryable);
        assert!(err.message.contains("90s"));
    }

    #[test]
    fn test_validation_and_configuration_not_retryable() {
        assert!(!Error::validation("x").retryable);
        assert!(!Error::configuration("x").retryable);
        assert!(!Error::abort().retryable);
        assert_eq!(Error::abort().kind, ErrorKind::Abort);
    }
}
