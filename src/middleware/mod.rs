//! # Middleware
//!
//! Path-scoped middleware. Every entry is registered with a prefix and is
//! selected for a request when [`path_matches`] holds; selection happens
//! after routing, for any HTTP method.

mod core;
mod metrics;
mod tracing;

pub use core::{
    path_matches, select, Middleware, MiddlewareChain, MiddlewareEntry, MAX_INLINE_MIDDLEWARE,
};
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
