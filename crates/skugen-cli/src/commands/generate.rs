use std::sync::Arc;

use skugen::{GenerationJob, Generator, ProgressEvent, RowBatch, Settings, spawn_generation};

use crate::cli::GenerateArgs;
use crate::error::CliError;
use crate::output;

pub async fn run(args: &GenerateArgs) -> Result<(), CliError> {
    let settings = apply_overrides(Settings::from_env(), args)?;
    let generator = Generator::from_settings(settings)?;
    tracing::debug!(?generator, "generator ready");

    let job = build_job(args)?;
    let batch = drive(Arc::new(generator), job).await?;

    if let Some(path) = &args.output {
        let format = output::export_format(path, args.format);
        output::write_export(&batch, path, format)?;
        eprintln!("Saved {} rows to {}", batch.len(), path.display());
    }
    print!("{}", stdout_text(&batch, args)?);
    Ok(())
}

/// What goes to stdout once the rows are in: the encoded table when a format
/// is given without a file, otherwise the preview unless `--preview 0`.
fn stdout_text(batch: &RowBatch, args: &GenerateArgs) -> Result<String, CliError> {
    match (&args.output, args.format) {
        (None, Some(format)) => output::encode(batch, format),
        _ if args.preview == 0 => Ok(String::new()),
        _ => Ok(output::render_preview(batch, args.preview)),
    }
}

/// Command-line flags layered over the environment.
fn apply_overrides(mut settings: Settings, args: &GenerateArgs) -> Result<Settings, CliError> {
    if args.mock {
        settings.use_mock = true;
    }
    if let Some(model) = &args.model {
        settings.default_model = model.clone();
    }
    if args.no_stream {
        settings.streaming = false;
    }
    if let Some(secs) = args.timeout {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(CliError::Input(format!(
                "--timeout must be a positive number of seconds, got {secs}"
            )));
        }
        settings.total_timeout = Some(secs);
    }
    Ok(settings)
}

fn build_job(args: &GenerateArgs) -> Result<GenerationJob, CliError> {
    let seed = args.seed.as_deref().map(output::load_seed).transpose()?;
    let columns = match (&args.columns_file, &seed) {
        (Some(path), _) => output::load_columns(path)?,
        (None, Some(seed)) => seed.columns(),
        (None, None) => args.columns.clone(),
    };
    if columns.is_empty() {
        return Err(CliError::Input(
            "give --columns, --columns-file or --seed".to_string(),
        ));
    }

    Ok(GenerationJob {
        columns,
        prompt: args.prompt.clone(),
        row_count: args.rows,
        seed,
    })
}

/// Run the job on a background task, echoing progress to stderr. Ctrl-C
/// cancels the generation instead of killing the process.
async fn drive(generator: Arc<Generator>, job: GenerationJob) -> Result<RowBatch, CliError> {
    let mut task = spawn_generation(generator, job);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        let next = tokio::select! {
            event = task.progress().recv() => Some(event),
            _ = &mut ctrl_c, if !interrupted => None,
        };
        match next {
            Some(Some(event)) => {
                if is_reported(&event) {
                    eprintln!("{event}");
                }
            }
            Some(None) => break,
            None => {
                interrupted = true;
                eprintln!("Cancelling...");
                task.cancel();
            }
        }
    }

    Ok(task.join().await?)
}

/// Per-row completion notices are left to the log; everything else is shown.
fn is_reported(event: &ProgressEvent) -> bool {
    if let ProgressEvent::ItemCompleted { index } = event {
        tracing::debug!(index, "row complete");
        return false;
    }
    true
}
