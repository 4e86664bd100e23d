// skugen-types: Layer 1 — data model, errors, configuration values and the transport contract
#![allow(clippy::result_large_err)]

pub mod catalog;
pub mod chat;
pub mod columns;
pub mod config;
pub mod error;
pub mod progress;
pub mod request;
pub mod row;
pub mod transport;

pub use catalog::*;
pub use chat::*;
pub use columns::*;
pub use config::*;
pub use error::*;
pub use progress::*;
pub use request::*;
pub use row::*;
pub use transport::*;
