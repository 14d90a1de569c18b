//! Error types for route compilation, request dispatch and context access.
//!
//! Build-time problems are [`RouteError`]s: the offending route is skipped and
//! the rest of the table still compiles. Request-time problems are
//! [`PipelineError`]s and only ever affect the request that raised them.

use http::Method;
use thiserror::Error;

/// A route that could not be compiled into its method's tree.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A second route resolved to a terminal node that already has a handler.
    #[error("duplicate route: {method} {path}")]
    Duplicate { method: Method, path: String },

    /// The pattern inside a `:|...|` segment did not compile.
    #[error("invalid regex segment `{segment}` in route {path}: {source}")]
    InvalidRegex {
        path: String,
        segment: String,
        #[source]
        source: regex::Error,
    },

    /// A `:` segment with nothing after the marker.
    #[error("empty parameter name in route {path}")]
    EmptyParamName { path: String },

    /// The method has no tree kind (e.g. TRACE, CONNECT, extension methods).
    #[error("unsupported method {method} for route {path}")]
    UnsupportedMethod { method: Method, path: String },
}

impl RouteError {
    /// The route pattern this error refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            RouteError::Duplicate { path, .. }
            | RouteError::InvalidRegex { path, .. }
            | RouteError::EmptyParamName { path }
            | RouteError::UnsupportedMethod { path, .. } => path,
        }
    }
}

/// A request-time failure inside the middleware/handler pipeline.
///
/// Every variant is answered with `500 Internal Server Error` unless the
/// response was already committed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A middleware returned an error in automatic mode.
    #[error("middleware #{index} ({prefix}) failed: {error}")]
    Middleware {
        index: usize,
        prefix: String,
        error: anyhow::Error,
    },

    /// The route handler returned an error.
    #[error("handler for {pattern} failed: {error}")]
    Handler { pattern: String, error: anyhow::Error },

    /// An error surfaced through the manual `next()` chain.
    #[error("middleware chain failed: {0}")]
    Chain(anyhow::Error),
}

/// Errors returned by [`Context`](crate::context::Context) accessors.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("path parameter `{0}` does not exist")]
    ParamNotFound(String),

    #[error("regex parameter #{0} does not exist")]
    RegexParamNotFound(usize),

    #[error("query parameter `{0}` does not exist")]
    QueryNotFound(String),

    #[error("invalid value `{value}` for `{name}`: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to encode JSON response: {0}")]
    Json(#[from] serde_json::Error),
}
