// Generator — validates inputs, then produces rows from the mock generator or
// the live pipeline (transport, reconciler, corrector, validator).

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use skugen_types::{
    ChatMessage, ChatRequest, ChatTransport, ColumnSet, Error, GenerationLimits,
    GenerationParams, GenerationRequest, OnProgress, ProgressEvent, RetryPolicy, RowBatch, Stage,
};

use crate::catalog_data::ModelRegistry;
use crate::correct::correct_row_count;
use crate::reconcile::{BraceCounter, StructureTracker, extract_json_array, reconcile_with};
use crate::session::ClientSession;
use crate::settings::{Settings, positive_secs};
use crate::transport::HttpTransport;
use crate::util::retry::with_retry;
use crate::{mock, prompt, validate};

/// Where a generation call is. `Failed` is reachable from every other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Validating,
    Mock,
    Live,
    Validated,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Mock => "mock",
            Self::Live => "live",
            Self::Validated => "validated",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    tracing::debug!(%phase, "generation phase");
}

/// Generates row batches for one client session.
///
/// All-or-nothing: a call either returns exactly the requested number of
/// well-shaped rows or fails, after sending a final `Failed` progress event.
pub struct Generator {
    session: ClientSession,
    registry: ModelRegistry,
    transport: Arc<dyn ChatTransport>,
    limits: GenerationLimits,
    params: GenerationParams,
    retry: RetryPolicy,
    total_timeout: Option<Duration>,
    streaming: bool,
}

impl Generator {
    /// Generator with default limits, sampling, retry and streaming.
    pub fn new(session: ClientSession, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            session,
            registry: ModelRegistry::builtin(),
            transport,
            limits: GenerationLimits::default(),
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
            total_timeout: None,
            streaming: true,
        }
    }

    /// Registry, session and HTTP transport as configured by `settings`.
    pub fn from_settings(mut settings: Settings) -> Result<Self, Error> {
        let registry = settings.registry()?;
        let session = ClientSession::from_settings(&mut settings, &registry);
        let transport = Arc::new(HttpTransport::new(&settings.timeout)?);

        Ok(Self {
            session,
            registry,
            transport,
            limits: settings.limits,
            params: settings.params,
            retry: settings.retry,
            total_timeout: settings
                .total_timeout
                .map(|secs| positive_secs("total timeout", secs))
                .transpose()?,
            streaming: settings.streaming,
        })
    }

    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Wall-clock ceiling for one call, continuation rounds included.
    pub fn with_total_timeout(mut self, limit: Duration) -> Self {
        self.total_timeout = Some(limit);
        self
    }

    /// `false` asks for one response body instead of a token stream.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// For key rotation, the mock switch and model changes between calls.
    pub fn session_mut(&mut self) -> &mut ClientSession {
        &mut self.session
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn limits(&self) -> GenerationLimits {
        self.limits
    }

    /// Switch the session to `name` (display name or identifier; unknown
    /// names select the registry default).
    pub fn select_model(&mut self, name: &str) -> &str {
        &self.session.select_model(&self.registry, name).display_name
    }

    /// Generate `row_count` rows over `columns` described by `prompt`.
    pub async fn generate<I, S>(
        &self,
        columns: I,
        prompt: &str,
        row_count: usize,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let outcome = self
            .run_bounded(ColumnSet::new(columns), prompt, row_count, None, on_progress)
            .await;
        self.finish(outcome, on_progress)
    }

    /// Like [`Generator::generate`], abandoning the call once `cancel` fires.
    ///
    /// The in-flight request is dropped and no rows are returned.
    pub async fn generate_with_cancel<I, S>(
        &self,
        columns: I,
        prompt: &str,
        row_count: usize,
        on_progress: &OnProgress,
        cancel: &CancellationToken,
    ) -> Result<RowBatch, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = ColumnSet::new(columns);
        let outcome = self
            .cancellable(
                self.run_bounded(columns, prompt, row_count, None, on_progress),
                cancel,
            )
            .await;
        self.finish(outcome, on_progress)
    }

    /// Generate `row_count` more rows in the style of an imported table.
    ///
    /// The seed's columns become the column set and its last row is quoted in
    /// the prompt. The seed itself is not part of the result.
    pub async fn continue_from(
        &self,
        seed: &RowBatch,
        prompt: &str,
        row_count: usize,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error> {
        let outcome = self
            .run_bounded(seed_columns(seed), prompt, row_count, Some(seed), on_progress)
            .await;
        self.finish(outcome, on_progress)
    }

    /// [`Generator::continue_from`] with cancellation.
    pub async fn continue_from_with_cancel(
        &self,
        seed: &RowBatch,
        prompt: &str,
        row_count: usize,
        on_progress: &OnProgress,
        cancel: &CancellationToken,
    ) -> Result<RowBatch, Error> {
        let outcome = self
            .cancellable(
                self.run_bounded(seed_columns(seed), prompt, row_count, Some(seed), on_progress),
                cancel,
            )
            .await;
        self.finish(outcome, on_progress)
    }

    async fn cancellable(
        &self,
        run: impl std::future::Future<Output = Result<RowBatch, Error>>,
        cancel: &CancellationToken,
    ) -> Result<RowBatch, Error> {
        if cancel.is_cancelled() {
            return Err(Error::abort());
        }
        tokio::select! {
            outcome = run => outcome,
            _ = cancel.cancelled() => {
                tracing::debug!("generation cancelled by caller");
                Err(Error::abort())
            }
        }
    }

    async fn run_bounded(
        &self,
        columns: Result<ColumnSet, Error>,
        prompt: &str,
        row_count: usize,
        seed: Option<&RowBatch>,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error> {
        let run = self.run(columns, prompt, row_count, seed, on_progress);
        match self.total_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or_else(|_| Err(Error::deadline_exceeded(limit))),
            None => run.await,
        }
    }

    async fn run(
        &self,
        columns: Result<ColumnSet, Error>,
        prompt: &str,
        row_count: usize,
        seed: Option<&RowBatch>,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error> {
        enter(Phase::Validating);
        let request = self
            .validate(columns, prompt, row_count, seed)
            .map_err(|e| e.in_stage(Stage::Validation))?;

        if self.session.use_mock() {
            enter(Phase::Mock);
            on_progress(&ProgressEvent::Started {
                rows: row_count,
                mock: true,
            });
            let batch = mock::mock_rows(request.columns(), request.row_count());
            enter(Phase::Validated);
            return Ok(batch);
        }

        let api_key = self.session.usable_key().ok_or_else(|| {
            Error::configuration(
                "No usable API key configured; set SKUGEN_API_KEY or switch to mock mode",
            )
            .in_stage(Stage::Validation)
        })?;

        enter(Phase::Live);
        on_progress(&ProgressEvent::Started {
            rows: row_count,
            mock: false,
        });

        let first = self.live_pass(&request, api_key, on_progress).await?;
        let batch = correct_row_count(
            first,
            &request,
            self.limits.max_correction_rounds,
            on_progress,
            move |follow_up| async move { self.live_pass(&follow_up, api_key, on_progress).await },
        )
        .await
        .map_err(|e| e.in_stage(Stage::Correction))?;

        validate::validate_batch(&batch, request.columns())
            .map_err(|e| e.in_stage(Stage::Shape))?;
        enter(Phase::Validated);
        Ok(batch)
    }

    fn validate(
        &self,
        columns: Result<ColumnSet, Error>,
        prompt: &str,
        row_count: usize,
        seed: Option<&RowBatch>,
    ) -> Result<GenerationRequest, Error> {
        let request = GenerationRequest::new(columns?, prompt, row_count, self.limits.max_rows)?;
        match seed.and_then(RowBatch::last) {
            Some(last) => {
                let seeded = prompt::seed_prompt(request.prompt(), last);
                request.follow_up(seeded, row_count)
            }
            None => Ok(request),
        }
    }

    /// One request to the model, parsed into rows. Counts are not corrected.
    async fn live_pass(
        &self,
        request: &GenerationRequest,
        api_key: &SecretString,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error> {
        let endpoint = self.session.endpoint();
        let chat = ChatRequest::default()
            .model(&endpoint.model_identifier)
            .messages(vec![
                ChatMessage::system(prompt::system_prompt(
                    request.columns(),
                    request.row_count(),
                )),
                ChatMessage::user(request.prompt()),
            ])
            .params(&self.params)
            .stream(self.streaming);
        let retry = self.retry_policy(on_progress);

        tracing::debug!(
            model = %endpoint.display_name,
            rows = request.row_count(),
            streaming = self.streaming,
            transport = self.transport.name(),
            "dispatching live request"
        );

        let text = if self.streaming {
            let mut tracker = BraceCounter::new(request.row_count());
            let fragments = with_retry(&retry, || {
                self.transport.stream(endpoint, api_key, chat.clone())
            })
            .await
            .map_err(|e| e.in_stage(Stage::Transport))?;
            // Started after the stream opened so retries do not skew the ETA.
            tracker.restart_clock();
            reconcile_with(fragments, &mut tracker, on_progress)
                .await
                .map_err(|e| {
                    let stage = if e.kind.is_transport_error() {
                        Stage::Transport
                    } else {
                        Stage::Stream
                    };
                    e.in_stage(stage)
                })?
        } else {
            let text = with_retry(&retry, || {
                self.transport.complete(endpoint, api_key, chat.clone())
            })
            .await
            .map_err(|e| e.in_stage(Stage::Transport))?;
            BraceCounter::without_eta(request.row_count()).observe(&text, on_progress);
            text
        };

        let values = extract_json_array(&text).map_err(|e| e.in_stage(Stage::Stream))?;
        let batch = validate::into_row_batch(values, request.columns())
            .map_err(|e| e.in_stage(Stage::Shape))?;
        tracing::debug!(
            parsed = batch.len(),
            requested = request.row_count(),
            "live pass parsed"
        );
        Ok(batch)
    }

    /// The configured policy, with retries also reported as progress.
    fn retry_policy(&self, on_progress: &OnProgress) -> RetryPolicy {
        let mut policy = self.retry.clone();
        let inner = policy.on_retry.take();
        let sink = on_progress.clone();
        policy.on_retry = Some(Arc::new(move |err: &Error, attempt, delay: Duration| {
            if let Some(inner) = &inner {
                inner(err, attempt, delay);
            }
            sink(&ProgressEvent::Retrying {
                attempt,
                delay_ms: delay.as_millis() as u64,
                reason: err.message.clone(),
            });
        }));
        policy
    }

    fn finish(
        &self,
        outcome: Result<RowBatch, Error>,
        on_progress: &OnProgress,
    ) -> Result<RowBatch, Error> {
        match outcome {
            Ok(batch) => {
                enter(Phase::Done);
                tracing::info!(
                    rows = batch.len(),
                    mock = self.session.use_mock(),
                    model = %self.session.endpoint().display_name,
                    "generation complete"
                );
                on_progress(&ProgressEvent::Done { rows: batch.len() });
                Ok(batch)
            }
            Err(err) => {
                enter(Phase::Failed);
                tracing::warn!(error = %err, "generation failed");
                on_progress(&ProgressEvent::Failed {
                    stage: err.stage,
                    message: err.message.clone(),
                });
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("session", &self.session)
            .field("transport", &self.transport.name())
            .field("limits", &self.limits)
            .field("streaming", &self.streaming)
            .field("total_timeout", &self.total_timeout)
            .finish()
    }
}

fn seed_columns(seed: &RowBatch) -> Result<ColumnSet, Error> {
    if seed.is_empty() {
        return Err(Error::validation("seed table has no rows to continue from"));
    }
    ColumnSet::new(seed.columns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use skugen_types::{ErrorKind, Row};
    use std::sync::Mutex;

    const TWO_ROWS: &str = r#"[{"颜色":"红","尺寸":"M"},{"颜色":"蓝","尺寸":"L"}]"#;

    fn live_session() -> ClientSession {
        ClientSession::new(
            Some(SecretString::from("sk-test".to_string())),
            false,
            ModelRegistry::builtin().default_endpoint(),
        )
    }

    fn generator(mock: MockTransport) -> (Generator, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let generator = Generator::new(live_session(), mock.clone()).with_retry(RetryPolicy {
            base_delay: 0.001,
            jitter: false,
            ..Default::default()
        });
        (generator, mock)
    }

    fn recorder() -> (OnProgress, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let on_progress: OnProgress = Arc::new(move |e| sink.lock().unwrap().push(e.clone()));
        (on_progress, events)
    }

    #[tokio::test]
    async fn test_live_stream_happy_path() {
        let (generator, mock) =
            generator(MockTransport::new().with_fragments(["好的：[", &TWO_ROWS[1..], "\n"]));
        let (on_progress, events) = recorder();

        let batch = generator
            .generate(["颜色", "尺寸"], "夏季T恤", 2, &on_progress)
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[1].get("颜色"), Some("蓝"));
        let sent = &mock.recorded_requests()[0];
        assert_eq!(sent.model, "deepseek-chat");
        assert!(sent.stream);
        assert_eq!(sent.messages[1].content, "夏季T恤");
        assert!(sent.messages[0].content.contains("恰好2行"));

        let events = events.lock().unwrap();
        assert_eq!(events.first(), Some(&ProgressEvent::Started { rows: 2, mock: false }));
        assert!(events.contains(&ProgressEvent::AllRowsComplete));
        assert_eq!(events.last(), Some(&ProgressEvent::Done { rows: 2 }));
    }

    #[tokio::test]
    async fn test_mock_mode_never_touches_transport() {
        let (mut generator, mock) = generator(MockTransport::new());
        generator.session_mut().set_use_mock(true);
        generator.session_mut().clear_api_key();

        let batch = generator
            .generate(["颜色", "尺寸"], "任意", 3, &skugen_types::ignore_progress())
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.rows()[0].get("颜色"), Some("测试数据_颜色_1"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_errors_fail_before_dispatch() {
        let (generator, mock) = generator(MockTransport::new());
        let (on_progress, events) = recorder();

        let err = generator
            .generate(["颜色", "颜色"], "x", 2, &on_progress)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.stage, Some(Stage::Validation));

        let err = generator
            .generate(["颜色"], "   ", 2, &on_progress)
            .await
            .unwrap_err();
        assert!(err.message.contains("prompt"));

        let err = generator
            .generate(["颜色"], "x", 51, &on_progress)
            .await
            .unwrap_err();
        assert!(err.message.contains("between 1 and 50"));

        assert_eq!(mock.call_count(), 0);
        assert!(events.lock().unwrap().iter().all(|e| matches!(
            e,
            ProgressEvent::Failed { stage: Some(Stage::Validation), .. }
        )));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let (mut generator, mock) = generator(MockTransport::new().with_content(TWO_ROWS));
        generator.session_mut().set_api_key(SecretString::from("dummy_key".to_string()));

        let err = generator
            .generate(["颜色"], "x", 1, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_deficit_triggers_continuation() {
        let (generator, mock) = generator(
            MockTransport::new()
                .with_content(r#"[{"颜色":"红","尺寸":"M"}]"#)
                .with_content(r#"[{"颜色":"绿","尺寸":"S"},{"颜色":"黑","尺寸":"XL"}]"#),
        );
        let (on_progress, events) = recorder();

        let batch = generator
            .generate(["颜色", "尺寸"], "T恤", 3, &on_progress)
            .await
            .unwrap();

        let colours: Vec<&str> = batch.iter().map(|r| r.get("颜色").unwrap()).collect();
        assert_eq!(colours, vec!["红", "绿", "黑"]);
        let second = &mock.recorded_requests()[1];
        assert!(second.messages[0].content.contains("恰好2行"));
        assert!(second.messages[1].content.contains("\"红\""));
        assert!(events
            .lock()
            .unwrap()
            .contains(&ProgressEvent::Continuing { deficit: 2, round: 1 }));
    }

    #[tokio::test]
    async fn test_gateway_error_is_retried_and_reported() {
        let (generator, mock) = generator(
            MockTransport::new()
                .with_error(Error::from_http_status(502, "Bad Gateway", "", None))
                .with_content(TWO_ROWS),
        );
        let (on_progress, events) = recorder();

        let batch = generator
            .generate(["颜色", "尺寸"], "T恤", 2, &on_progress)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(mock.call_count(), 2);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Retrying { attempt: 1, .. })));
    }

    #[tokio::test]
    async fn test_client_error_fails_fast_with_transport_stage() {
        let (generator, mock) = generator(
            MockTransport::new()
                .with_error(Error::from_http_status(401, "Authentication Fails", "{}", None)),
        );
        let (on_progress, events) = recorder();

        let err = generator
            .generate(["颜色"], "x", 1, &on_progress)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Some(Stage::Transport));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&ProgressEvent::Failed {
                stage: Some(Stage::Transport),
                message: "HTTP 401: Authentication Fails".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_unparseable_output_is_stream_stage_parse_error() {
        let (generator, _) = generator(MockTransport::new().with_content("抱歉，我无法完成"));
        let err = generator
            .generate(["颜色"], "x", 1, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.stage, Some(Stage::Stream));
        assert_eq!(err.raw_text.as_deref(), Some("抱歉，我无法完成"));
    }

    #[tokio::test]
    async fn test_empty_value_is_shape_error() {
        let (generator, _) =
            generator(MockTransport::new().with_content(r#"[{"颜色":" ","尺寸":"M"}]"#));
        let err = generator
            .generate(["颜色", "尺寸"], "x", 1, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Shape);
        assert_eq!(err.stage, Some(Stage::Shape));
        assert!(err.message.contains("颜色"));
    }

    #[tokio::test]
    async fn test_persistent_shortfall_hits_ceiling() {
        let one = r#"[{"颜色":"红"}]"#;
        let (generator, mock) = generator(
            MockTransport::new()
                .with_content(one)
                .with_content("[]")
                .with_content("[]"),
        );
        let generator = generator.with_limits(GenerationLimits {
            max_rows: 50,
            max_correction_rounds: 2,
        });

        let err = generator
            .generate(["颜色"], "x", 3, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Shape);
        assert_eq!(err.stage, Some(Stage::Correction));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_streaming_uses_complete() {
        let (generator, mock) = generator(MockTransport::new().with_fragments(["[", &TWO_ROWS[1..]]));
        let generator = generator.with_streaming(false);
        let (on_progress, events) = recorder();

        let batch = generator
            .generate(["颜色", "尺寸"], "x", 2, &on_progress)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(!mock.recorded_requests()[0].stream);
        assert!(events.lock().unwrap().contains(&ProgressEvent::AllRowsComplete));
    }

    #[tokio::test]
    async fn test_non_streaming_body_reports_no_eta() {
        let three = r#"[{"颜色":"红"},{"颜色":"蓝"},{"颜色":"白"}]"#;
        let (generator, _) = generator(MockTransport::new().with_content(three));
        let generator = generator.with_streaming(false);
        let (on_progress, events) = recorder();

        generator
            .generate(["颜色"], "x", 3, &on_progress)
            .await
            .unwrap();
        let etas: Vec<Option<Duration>> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::ItemStarted { eta, .. } => Some(*eta),
                _ => None,
            })
            .collect();
        assert_eq!(etas, vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_failure_after_first_fragment_is_not_retried() {
        let reset = Error::network(
            "reset",
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        );
        assert!(reset.retryable);
        let (generator, mock) = generator(
            MockTransport::new()
                .with_stream_error_after([r#"[{"颜色":"红"}"#], reset)
                .with_content(r#"[{"颜色":"蓝"}]"#),
        );
        let (on_progress, events) = recorder();

        let err = generator
            .generate(["颜色"], "x", 1, &on_progress)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.stage, Some(Stage::Transport));
        assert_eq!(mock.call_count(), 1);

        let events = events.lock().unwrap();
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Retrying { .. })));
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Failed {
                stage: Some(Stage::Transport),
                message: "reset".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_stream() {
        let (generator, _) = generator(
            MockTransport::new()
                .with_fragments(["[", "{\"颜色\":\"红\"}", "]"])
                .with_fragment_delay(Duration::from_secs(60)),
        );
        let (on_progress, events) = recorder();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = generator
            .generate_with_cancel(["颜色"], "x", 1, &on_progress, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Abort);
        assert!(matches!(
            events.lock().unwrap().last(),
            Some(ProgressEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_short_circuits() {
        let (generator, mock) = generator(MockTransport::new().with_content(TWO_ROWS));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = generator
            .generate_with_cancel(["颜色"], "x", 1, &skugen_types::ignore_progress(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Abort);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_bounds_the_call() {
        let (generator, _) = generator(
            MockTransport::new()
                .with_fragments(["[", "]"])
                .with_fragment_delay(Duration::from_secs(30)),
        );
        let generator = generator.with_total_timeout(Duration::from_secs(5));

        let err = generator
            .generate(["颜色"], "x", 1, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RequestTimeout);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_continue_from_seed_uses_its_columns_and_last_row() {
        let (generator, mock) = generator(
            MockTransport::new().with_content(r#"[{"颜色":"白","尺寸":"XS"}]"#),
        );
        let seed = RowBatch::new(vec![
            Row::new().with("颜色", "红").with("尺寸", "M"),
            Row::new().with("颜色", "紫").with("尺寸", "XXL"),
        ]);

        let batch = generator
            .continue_from(&seed, "继续", 1, &skugen_types::ignore_progress())
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        let sent = &mock.recorded_requests()[0];
        assert!(sent.messages[0].content.contains("\"颜色\", \"尺寸\""));
        assert!(sent.messages[1].content.starts_with("继续"));
        assert!(sent.messages[1].content.contains("XXL"));
        assert!(!sent.messages[1].content.contains("\"M\""));
    }

    #[tokio::test]
    async fn test_continue_from_empty_seed_is_validation_error() {
        let (generator, _) = generator(MockTransport::new());
        let err = generator
            .continue_from(&RowBatch::default(), "继续", 1, &skugen_types::ignore_progress())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_select_model_and_debug_redaction() {
        let (mut generator, _) = generator(MockTransport::new());
        assert_eq!(generator.select_model("deepseek-reasoner"), "DeepSeek-R1");
        let debug = format!("{generator:?}");
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("mock"));
    }
}
