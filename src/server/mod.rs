//! HTTP transport on `may_minihttp`.
//!
//! [`RouterService`] converts each wire request into an `http::Request`,
//! dispatches it and writes the buffered response back. [`start`] binds a
//! listener and returns a [`ServerHandle`].

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{start, ServerHandle, MAX_HEADERS};
pub use request::into_http_request;
pub use response::{status_reason, write_response};
pub use service::RouterService;
