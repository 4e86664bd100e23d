// HTTP transport for OpenAI-compatible chat-completion endpoints.

use std::time::Duration;

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use skugen_types::{
    BoxFuture, BoxStream, ChatRequest, ChatTransport, Error, ModelEndpoint, TransportTimeout,
};

use crate::settings::positive_secs;
use crate::util::http::{delta_content, message_content, parse_error_message, parse_retry_after};
use crate::util::sse::{SseDecoder, SseFrame};

/// Talks to any endpoint that speaks the `/v1/chat/completions` protocol
/// (DeepSeek, vLLM, Ollama and friends).
///
/// The URL comes from the [`ModelEndpoint`] of each call, so one transport
/// serves every model in a registry.
pub struct HttpTransport {
    http_client: reqwest::Client,
    /// Longest wait for the next streamed chunk.
    stream_read_timeout: Duration,
}

impl HttpTransport {
    /// Transport with the given connect, request and stream-read timeouts.
    pub fn new(timeout: &TransportTimeout) -> Result<Self, Error> {
        Self::builder().timeout(timeout.clone()).build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    fn build_headers(api_key: &SecretString) -> Result<reqwest::header::HeaderMap, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.expose_secret())
            .parse()
            .map_err(|_| {
                Error::configuration("Invalid API key: contains non-ASCII or control characters")
            })?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// POST the request and return the response once it has a 2xx status.
    async fn send(
        &self,
        endpoint: &ModelEndpoint,
        api_key: &SecretString,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, Error> {
        request.validate()?;
        let headers = Self::build_headers(api_key)?;

        tracing::debug!(
            url = %endpoint.url,
            model = %request.model,
            stream = request.stream,
            "sending chat completion request"
        );
        let response = self
            .http_client
            .post(&endpoint.url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(&body);
        tracing::debug!(status = status.as_u16(), %message, "endpoint rejected request");
        Err(Error::from_http_status(
            status.as_u16(),
            message,
            body,
            retry_after,
        ))
    }

    async fn do_complete(
        &self,
        endpoint: &ModelEndpoint,
        api_key: &SecretString,
        request: ChatRequest,
    ) -> Result<String, Error> {
        let request = request.stream(false);
        let response = self.send(endpoint, api_key, &request).await?;
        let body = response.text().await.map_err(map_reqwest_error)?;

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| Error::parse(format!("Response body is not valid JSON: {e}"), &body))?;
        message_content(&json)
            .map(str::to_string)
            .ok_or_else(|| Error::parse("Response has no choices[0].message.content", body))
    }

    async fn do_stream<'a>(
        &'a self,
        endpoint: &'a ModelEndpoint,
        api_key: &'a SecretString,
        request: ChatRequest,
    ) -> Result<BoxStream<'a, Result<String, Error>>, Error> {
        let request = request.stream(true);
        let response = self.send(endpoint, api_key, &request).await?;
        let read_timeout = self.stream_read_timeout;

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut bytes = response.bytes_stream();

            loop {
                let chunk = match tokio::time::timeout(read_timeout, bytes.next()).await {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(e))) => {
                        yield Err(map_reqwest_error(e));
                        return;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        yield Err(Error::timeout(
                            format!("No stream data for {read_timeout:?}"),
                            std::io::Error::new(std::io::ErrorKind::TimedOut, "stream read timeout"),
                        ));
                        return;
                    }
                };

                for frame in decoder.feed(&chunk) {
                    match frame {
                        SseFrame::Done => return,
                        SseFrame::Data(data) => {
                            if let Some(fragment) = decode_frame(&data) {
                                yield Ok(fragment);
                            }
                        }
                    }
                }
            }

            if let Some(SseFrame::Data(data)) = decoder.finish() {
                if let Some(fragment) = decode_frame(&data) {
                    yield Ok(fragment);
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Content fragment of one `data:` payload. Unparseable frames and frames
/// without content (role announcements, usage trailers) yield nothing.
fn decode_frame(data: &str) -> Option<String> {
    match serde_json::from_str::<Value>(data) {
        Ok(json) => delta_content(&json)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Err(e) => {
            tracing::warn!("Skipping unparseable stream frame: {e}");
            None
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {e}"), e)
    } else {
        Error::network(format!("HTTP request failed: {e}"), e)
    }
}

impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn complete<'a>(
        &'a self,
        endpoint: &'a ModelEndpoint,
        api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<String, Error>> {
        Box::pin(self.do_complete(endpoint, api_key, request))
    }

    fn stream<'a>(
        &'a self,
        endpoint: &'a ModelEndpoint,
        api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<String, Error>>, Error>> {
        Box::pin(self.do_stream(endpoint, api_key, request))
    }
}

/// Builder for an [`HttpTransport`] with custom timeouts or default headers.
#[derive(Default)]
pub struct HttpTransportBuilder {
    timeout: Option<TransportTimeout>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: TransportTimeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Headers sent with every request, e.g. an organisation id.
    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpTransport, Error> {
        let timeout = self.timeout.unwrap_or_default();
        let mut builder = reqwest::Client::builder()
            .connect_timeout(positive_secs("connect timeout", timeout.connect)?)
            .timeout(positive_secs("request timeout", timeout.request)?);
        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(HttpTransport {
            http_client,
            stream_read_timeout: positive_secs("stream read timeout", timeout.stream_read)?,
        })
    }
}
