// ChatTransport trait — the contract between the generator and the network.

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use secrecy::SecretString;

use crate::catalog::ModelEndpoint;
use crate::chat::ChatRequest;
use crate::error::Error;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed stream that is Send.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Sends chat-completion requests to an endpoint.
///
/// Implementations own connection and read timeouts; retrying is left to the
/// caller. Fragment decoding problems (bad UTF-8, unparseable frames) are the
/// implementation's to skip; only failures that end the exchange are yielded
/// as errors.
pub trait ChatTransport: Send + Sync {
    /// Short name for logs (e.g., "http", "mock").
    fn name(&self) -> &str;

    /// Send a non-streaming request and return the full assistant content.
    fn complete<'a>(
        &'a self,
        endpoint: &'a ModelEndpoint,
        api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<String, Error>>;

    /// Send a streaming request. Resolves once the endpoint has accepted it
    /// (2xx status), then yields assistant content fragments in order.
    fn stream<'a>(
        &'a self,
        endpoint: &'a ModelEndpoint,
        api_key: &'a SecretString,
        request: ChatRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<String, Error>>, Error>>;
}
