// Progress events — one-way status updates from a running generation to its caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Stage;

/// Callback receiving progress events. Must be cheap; it runs inline on the
/// generation task.
pub type OnProgress = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// A progress sink that discards everything.
pub fn ignore_progress() -> OnProgress {
    Arc::new(|_| {})
}

/// A status update. Render with `Display` for the human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Inputs validated, generation dispatched.
    Started { rows: usize, mock: bool },
    /// The opening `[` of the row array was seen.
    StructureStarted,
    /// An opening `{` was seen. `eta` is present once an average is available.
    ItemStarted {
        index: usize,
        total: usize,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_secs")]
        eta: Option<Duration>,
    },
    /// A closing `}` was seen.
    ItemCompleted { index: usize },
    /// The closing `]` was seen.
    AllRowsComplete,
    /// A transient transport failure is being retried.
    Retrying { attempt: u32, delay_ms: u64, reason: String },
    /// The model returned too few rows; asking for the rest.
    Continuing { deficit: usize, round: u32 },
    /// The model returned too many rows; the tail was dropped.
    Truncated { from: usize, to: usize },
    /// Terminal success.
    Done { rows: usize },
    /// Terminal failure, sent before the error is returned.
    Failed { stage: Option<Stage>, message: String },
}

impl ProgressEvent {
    /// `true` for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started { rows, mock: true } => {
                write!(f, "Generating {rows} rows from mock data")
            }
            Self::Started { rows, mock: false } => write!(f, "Requesting {rows} rows from the model"),
            Self::StructureStarted => f.write_str("Model started writing the row list"),
            Self::ItemStarted {
                index,
                total,
                eta: Some(eta),
            } => write!(
                f,
                "Generating row {index} of {total} (about {}s remaining)",
                eta.as_secs()
            ),
            Self::ItemStarted { index, total, .. } => {
                write!(f, "Generating row {index} of {total}")
            }
            Self::ItemCompleted { index } => write!(f, "Row {index} complete"),
            Self::AllRowsComplete => f.write_str("All rows received"),
            Self::Retrying {
                attempt,
                delay_ms,
                reason,
            } => write!(
                f,
                "Request failed ({reason}); retry {attempt} in {delay_ms} ms"
            ),
            Self::Continuing { deficit, round } => write!(
                f,
                "Model returned too few rows; requesting {deficit} more (round {round})"
            ),
            Self::Truncated { from, to } => {
                write!(f, "Model returned {from} rows; keeping the first {to}")
            }
            Self::Done { rows } => write!(f, "Generated {rows} rows"),
            Self::Failed {
                stage: Some(stage),
                message,
            } => write!(f, "Generation failed during {stage}: {message}"),
            Self::Failed {
                stage: None,
                message,
            } => write!(f, "Generation failed: {message}"),
        }
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64))
    }
}
