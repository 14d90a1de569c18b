//! Dispatcher core module - hot path for request dispatch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, StatusCode};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::context::{Context, Response};
use crate::error::PipelineError;
use crate::ids::RequestId;
use crate::middleware::{select, MiddlewareChain, MiddlewareEntry};
use crate::router::{RouteMatch, RouteTable};

/// How the middleware pipeline advances.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// The dispatcher runs every matching middleware in order, then the
    /// handler. The first middleware error aborts the request with 500.
    Automatic,
    /// Each middleware calls [`Context::next`] to continue the chain.
    #[default]
    Manual,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchMode::Automatic => "automatic",
            DispatchMode::Manual => "manual",
        })
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(DispatchMode::Automatic),
            "manual" => Ok(DispatchMode::Manual),
            other => Err(format!(
                "unknown dispatch mode `{other}` (expected `automatic` or `manual`)"
            )),
        }
    }
}

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The pipeline ran to completion, or a manual middleware stopped it.
    Completed,
    /// No route for the method and path; a 404 was written.
    NotFound,
    /// The pipeline failed. A 500 was written unless the response was
    /// already committed.
    Failed(PipelineError),
}

impl DispatchOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed)
    }
}

/// Immutable request entry point: compiled routes, middleware and mode.
///
/// Built by [`Registry::build`](crate::registry::Registry::build) and
/// shared across coroutines by `Arc`; nothing here is mutated per request.
pub struct Dispatcher {
    table: RouteTable,
    middlewares: Vec<MiddlewareEntry>,
    mode: DispatchMode,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable, middlewares: Vec<MiddlewareEntry>, mode: DispatchMode) -> Self {
        Self {
            table,
            middlewares,
            mode,
        }
    }

    #[inline]
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[inline]
    #[must_use]
    pub fn middlewares(&self) -> &[MiddlewareEntry] {
        &self.middlewares
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Middleware that apply to `path`, in registration order.
    #[must_use]
    pub fn matching_middleware(&self, path: &str) -> MiddlewareChain<'_> {
        select(&self.middlewares, path)
    }

    /// Route `request` and run its pipeline, writing into `response`.
    pub fn dispatch(&self, request: &Request<Vec<u8>>, response: &mut Response) -> DispatchOutcome {
        let method = request.method();
        let path = request.uri().path();
        let request_id = RequestId::from_headers(request.headers());

        let Some(RouteMatch { endpoint, params }) = self.table.lookup(method, path) else {
            write_json_error(
                response,
                StatusCode::NOT_FOUND,
                json!({
                    "error": "Not Found",
                    "method": method.as_str(),
                    "path": path,
                }),
            );
            return DispatchOutcome::NotFound;
        };

        let decoded_path = percent_decode_str(path).decode_utf8_lossy();
        let middlewares = self.matching_middleware(&decoded_path);
        debug!(
            method = %method,
            path = %path,
            route_pattern = %endpoint.pattern,
            middleware_count = middlewares.len(),
            mode = %self.mode,
            request_id = %request_id,
            "Dispatching request"
        );

        let pattern = endpoint.pattern;
        let result = {
            let mut ctx = Context::new(
                request,
                response,
                request_id,
                Arc::clone(&pattern),
                params,
                middlewares,
                endpoint.handler,
                self.mode,
            );
            ctx.run()
        };

        let Err(err) = result else {
            return DispatchOutcome::Completed;
        };

        error!(
            method = %method,
            path = %path,
            route_pattern = %pattern,
            request_id = %request_id,
            error = %err,
            "Request pipeline failed"
        );

        let body = json!({
            "error": "Internal Server Error",
            "method": method.as_str(),
            "path": path,
            "request_id": request_id,
        });
        match &err {
            PipelineError::Middleware { .. } => {
                response.reset();
                write_json_error(response, StatusCode::INTERNAL_SERVER_ERROR, body);
            }
            _ if response.is_committed() => {
                warn!(
                    status = response.status().as_u16(),
                    request_id = %request_id,
                    "Response already committed; error not reported to client"
                );
            }
            _ => write_json_error(response, StatusCode::INTERNAL_SERVER_ERROR, body),
        }
        DispatchOutcome::Failed(err)
    }

    /// Convenience wrapper around [`dispatch`](Self::dispatch) that owns
    /// the request and returns the finished response.
    #[must_use]
    pub fn handle(&self, request: Request<Vec<u8>>) -> Response {
        let mut response = Response::new();
        let _ = self.dispatch(&request, &mut response);
        response
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("middlewares", &self.middlewares)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Replace the response with a JSON error body.
pub fn write_json_error(response: &mut Response, status: StatusCode, body: Value) {
    response.set_status(status);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response.set_body(body.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_mode_parsing() {
        assert_eq!("automatic".parse(), Ok(DispatchMode::Automatic));
        assert_eq!(" Manual ".parse(), Ok(DispatchMode::Manual));
        assert!("sometimes".parse::<DispatchMode>().is_err());
        assert_eq!(DispatchMode::default(), DispatchMode::Manual);
    }

    #[test]
    fn test_empty_dispatcher_answers_404() {
        let dispatcher = Dispatcher::new(RouteTable::default(), Vec::new(), DispatchMode::Manual);
        let req = Request::get("/missing").body(Vec::new()).unwrap();
        let res = dispatcher.handle(req);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["path"], "/missing");
    }
}
