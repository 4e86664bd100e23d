// Stream reconciler — accumulates streamed fragments, reports row progress,
// and extracts the JSON row array once the stream ends.

use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::time::Instant;

use skugen_types::{Error, OnProgress, ProgressEvent};

/// Turns raw streamed text into progress events.
///
/// Implementations see every fragment in arrival order and must not fail:
/// progress is advisory and never affects the accumulated text.
pub trait StructureTracker: Send {
    fn observe(&mut self, fragment: &str, on_progress: &OnProgress);
}

/// Progress heuristic over the structural characters `[`, `{`, `}` and `]`.
///
/// Characters are counted wherever they appear, including inside string
/// values, so counts can drift on braces in generated text.
#[derive(Debug)]
pub struct BraceCounter {
    expected_rows: usize,
    started_at: Instant,
    structure_started: bool,
    items_started: usize,
    all_complete: bool,
    report_eta: bool,
}

impl BraceCounter {
    /// Start the ETA clock now.
    pub fn new(expected_rows: usize) -> Self {
        Self {
            expected_rows,
            started_at: Instant::now(),
            structure_started: false,
            items_started: 0,
            all_complete: false,
            report_eta: true,
        }
    }

    /// Counter that never estimates time left. For text that arrives in one
    /// piece, where elapsed time says nothing about the remaining rows.
    pub fn without_eta(expected_rows: usize) -> Self {
        Self {
            report_eta: false,
            ..Self::new(expected_rows)
        }
    }

    /// Reset the ETA clock, e.g. once the response has actually started.
    pub fn restart_clock(&mut self) {
        self.started_at = Instant::now();
    }

    pub fn items_started(&self) -> usize {
        self.items_started
    }

    fn eta(&self) -> Option<Duration> {
        if !self.report_eta || self.items_started <= 1 {
            return None;
        }
        let per_item = self.started_at.elapsed() / self.items_started as u32;
        let remaining = self.expected_rows.saturating_sub(self.items_started);
        Some(per_item * remaining as u32)
    }
}

impl StructureTracker for BraceCounter {
    fn observe(&mut self, fragment: &str, on_progress: &OnProgress) {
        for ch in fragment.chars() {
            match ch {
                '[' if !self.structure_started => {
                    self.structure_started = true;
                    on_progress(&ProgressEvent::StructureStarted);
                }
                '{' => {
                    self.items_started += 1;
                    on_progress(&ProgressEvent::ItemStarted {
                        index: self.items_started,
                        total: self.expected_rows,
                        eta: self.eta(),
                    });
                }
                '}' => on_progress(&ProgressEvent::ItemCompleted {
                    index: self.items_started,
                }),
                ']' if !self.all_complete => {
                    self.all_complete = true;
                    on_progress(&ProgressEvent::AllRowsComplete);
                }
                _ => {}
            }
        }
    }
}

/// Drain `fragments` into one string, reporting progress through a
/// [`BraceCounter`] sized for `expected_rows`.
pub async fn reconcile<S>(
    fragments: S,
    expected_rows: usize,
    on_progress: &OnProgress,
) -> Result<String, Error>
where
    S: Stream<Item = Result<String, Error>>,
{
    let mut tracker = BraceCounter::new(expected_rows);
    reconcile_with(fragments, &mut tracker, on_progress).await
}

/// Like [`reconcile`] with a caller-supplied tracker.
///
/// A fragment error ends the exchange and is returned as is. The text is
/// never parsed here; see [`extract_json_array`].
pub async fn reconcile_with<S>(
    fragments: S,
    tracker: &mut dyn StructureTracker,
    on_progress: &OnProgress,
) -> Result<String, Error>
where
    S: Stream<Item = Result<String, Error>>,
{
    let mut fragments = std::pin::pin!(fragments);
    let mut text = String::new();
    let mut count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        text.push_str(&fragment);
        tracker.observe(&fragment, on_progress);
        count += 1;
    }

    tracing::debug!(fragments = count, bytes = text.len(), "stream drained");
    Ok(text)
}

/// Parse the slice from the first `[` to the last `]` as a JSON array.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, Error> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(Error::parse("No JSON array found in model output", text));
    };
    if end < start {
        return Err(Error::parse("No JSON array found in model output", text));
    }

    serde_json::from_str::<Vec<Value>>(&text[start..=end])
        .map_err(|e| Error::parse(format!("Model output is not a valid JSON array: {e}"), text))
}
