// Background generation — run a generator on its own task and stream progress back.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use skugen_types::{Error, OnProgress, ProgressEvent, RowBatch};

use crate::generator::Generator;

/// What to generate on the background task.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub columns: Vec<String>,
    pub prompt: String,
    pub row_count: usize,
    /// Imported table to continue from. Its columns replace `columns`.
    pub seed: Option<RowBatch>,
}

/// Handle to a generation running on a spawned task.
///
/// Progress events arrive on [`GenerationTask::progress`] in order, ending
/// with `Done` or `Failed`. Dropping the handle does not stop the task; call
/// [`GenerationTask::cancel`].
pub struct GenerationTask {
    handle: JoinHandle<Result<RowBatch, Error>>,
    cancel: CancellationToken,
    progress: mpsc::UnboundedReceiver<ProgressEvent>,
}

/// Spawn `job` on the current tokio runtime.
pub fn spawn_generation(generator: Arc<Generator>, job: GenerationJob) -> GenerationTask {
    let cancel = CancellationToken::new();
    let (tx, progress) = mpsc::unbounded_channel();
    let on_progress: OnProgress = Arc::new(move |event| {
        // The receiver may be gone if the caller only wants the result.
        let _ = tx.send(event.clone());
    });

    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        match &job.seed {
            Some(seed) => {
                generator
                    .continue_from_with_cancel(seed, &job.prompt, job.row_count, &on_progress, &token)
                    .await
            }
            None => {
                generator
                    .generate_with_cancel(&job.columns, &job.prompt, job.row_count, &on_progress, &token)
                    .await
            }
        }
    });

    GenerationTask {
        handle,
        cancel,
        progress,
    }
}

impl GenerationTask {
    /// Ask the task to stop. It finishes with an `Abort` error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Progress receiver. Yields `None` once the task has finished and every
    /// event has been read.
    pub fn progress(&mut self) -> &mut mpsc::UnboundedReceiver<ProgressEvent> {
        &mut self.progress
    }

    /// Wait for the result. A panic on the task is resumed here.
    pub async fn join(self) -> Result<RowBatch, Error> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(Error::abort()),
        }
    }
}
