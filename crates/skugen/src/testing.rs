// MockTransport — scripted chat transport for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use skugen_types::{
    BoxFuture, BoxStream, ChatRequest, ChatTransport, Error, ModelEndpoint,
};

enum Reply {
    /// Accepted; the fragments (or a mid-stream error) follow.
    Stream(Vec<Result<String, Error>>),
    /// Rejected before any content, like a non-2xx status.
    Reject(Error),
}

/// Replays queued replies in FIFO order, one per `complete()` or `stream()` call.
///
/// `complete()` joins a queued stream's fragments into one body.
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    recorded: Mutex<Vec<ChatRequest>>,
    call_count: AtomicUsize,
    fragment_delay: Option<Duration>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            recorded: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            fragment_delay: None,
        }
    }

    /// Queue a reply streamed as the given fragments.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = fragments.into_iter().map(|f| Ok(f.into())).collect();
        lock(&self.replies).push_back(Reply::Stream(items));
        self
    }

    /// Queue a reply delivered as a single fragment.
    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.with_fragments([content.into()])
    }

    /// Queue a rejection, returned before any fragment.
    pub fn with_error(self, error: Error) -> Self {
        lock(&self.replies).push_back(Reply::Reject(error));
        self
    }

    /// Queue a stream that yields `fragments` and then fails with `error`.
    pub fn with_stream_error_after<I, S>(self, fragments: I, error: Error) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<Result<String, Error>> =
            fragments.into_iter().map(|f| Ok(f.into())).collect();
        items.push(Err(error));
        lock(&self.replies).push_back(Reply::Stream(items));
        self
    }

    /// Sleep before each fragment. Pair with `tokio::time::pause()`.
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order.
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        lock(&self.recorded).clone()
    }

    fn next_reply(&self, request: ChatRequest) -> Reply {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.recorded).push(request);
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Reply::Reject(Error::configuration("MockTransport: no replies queued")))
    }
}

impl ChatTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(
        &'a self,
        _endpoint: &'a ModelEndpoint,
        _api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<String, Error>> {
        let reply = self.next_reply(request);
        Box::pin(async move {
            match reply {
                Reply::Reject(error) => Err(error),
                Reply::Stream(items) => items.into_iter().collect::<Result<String, Error>>(),
            }
        })
    }

    fn stream<'a>(
        &'a self,
        _endpoint: &'a ModelEndpoint,
        _api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<String, Error>>, Error>> {
        let reply = self.next_reply(request);
        let delay = self.fragment_delay;
        Box::pin(async move {
            let items = match reply {
                Reply::Reject(error) => return Err(error),
                Reply::Stream(items) => items,
            };
            let stream = async_stream::stream! {
                for item in items {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    yield item;
                }
            };
            Ok(Box::pin(stream) as BoxStream<'a, Result<String, Error>>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use skugen_types::ErrorKind;

    fn endpoint() -> ModelEndpoint {
        ModelEndpoint {
            display_name: "Mock".into(),
            model_identifier: "mock".into(),
            url: "http://localhost".into(),
            description: String::new(),
        }
    }

    fn key() -> SecretString {
        SecretString::from("k".to_string())
    }

    #[tokio::test]
    async fn test_replies_in_fifo_order() {
        let mock = MockTransport::new()
            .with_content("first")
            .with_fragments(["se", "cond"]);
        let (ep, k) = (endpoint(), key());

        assert_eq!(mock.complete(&ep, &k, ChatRequest::default()).await.unwrap(), "first");
        let fragments: Vec<String> = mock
            .stream(&ep, &k, ChatRequest::default())
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["se", "cond"]);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rejection_and_empty_queue() {
        let mock = MockTransport::new().with_error(Error::from_http_status(503, "busy", "", None));
        let (ep, k) = (endpoint(), key());

        let err = mock.complete(&ep, &k, ChatRequest::default()).await.unwrap_err();
        assert_eq!(err.status_code, Some(503));
        let err = mock.complete(&ep, &k, ChatRequest::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let mock = MockTransport::new().with_content("[]");
        let (ep, k) = (endpoint(), key());
        mock.complete(&ep, &k, ChatRequest::default().model("m1"))
            .await
            .unwrap();
        assert_eq!(mock.recorded_requests()[0].model, "m1");
    }
}
