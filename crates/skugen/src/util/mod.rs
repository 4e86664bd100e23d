pub(crate) mod http;
pub mod retry;
pub(crate) mod sse;
