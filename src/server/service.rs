use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::StatusCode;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use tracing::{error, info, warn};

use super::request::into_http_request;
use super::response::write_response;
use crate::context;
use crate::dispatcher::{write_json_error, Dispatcher};

/// `may_minihttp` service backed by a swappable [`Dispatcher`].
///
/// Clones share the same dispatcher slot, so [`reload`](Self::reload) on
/// any clone is seen by every connection. Requests already running keep
/// the dispatcher they started with.
#[derive(Clone)]
pub struct RouterService {
    dispatcher: Arc<ArcSwap<Dispatcher>>,
}

impl RouterService {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
        }
    }

    /// Serve from an externally owned slot.
    #[must_use]
    pub fn from_shared(dispatcher: Arc<ArcSwap<Dispatcher>>) -> Self {
        Self { dispatcher }
    }

    /// Atomically replace the routing table and middleware.
    pub fn reload(&self, dispatcher: Dispatcher) {
        info!(
            routes_count = dispatcher.table().len(),
            middleware_count = dispatcher.middlewares().len(),
            mode = %dispatcher.mode(),
            "Dispatcher reloaded"
        );
        self.dispatcher.store(Arc::new(dispatcher));
    }

    /// Snapshot of the dispatcher currently serving requests.
    #[must_use]
    pub fn current(&self) -> Arc<Dispatcher> {
        self.dispatcher.load_full()
    }

    /// Dispatch one request, turning a panic anywhere in the pipeline into
    /// a `500`.
    #[must_use]
    pub fn respond(&self, request: http::Request<Vec<u8>>) -> context::Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let dispatcher = self.dispatcher.load();

        match catch_unwind(AssertUnwindSafe(|| dispatcher.handle(request))) {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    method = %method,
                    path = %path,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                let mut response = context::Response::new();
                write_json_error(
                    &mut response,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Internal Server Error",
                        "method": method.as_str(),
                        "path": path,
                    }),
                );
                response
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

impl HttpService for RouterService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match into_http_request(req) {
            Ok(request) => self.respond(request),
            Err(err) => {
                warn!(error = %err, "Rejecting malformed request");
                let mut response = context::Response::new();
                write_json_error(
                    &mut response,
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Bad Request", "details": err.to_string() }),
                );
                response
            }
        };
        write_response(res, response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::registry::Registry;

    fn get(path: &str) -> http::Request<Vec<u8>> {
        http::Request::get(path).body(Vec::new()).unwrap()
    }

    #[test]
    fn test_panicking_handler_becomes_500() {
        let mut registry = Registry::new();
        registry.get("/boom", |_: &mut Context<'_>| -> anyhow::Result<()> {
            panic!("kaboom");
        });
        let service = RouterService::new(registry.build());

        let response = service.respond(get("/boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_reload_swaps_routes() {
        let service = RouterService::new(Registry::new().build());
        assert_eq!(service.respond(get("/hello")).status(), StatusCode::NOT_FOUND);

        let mut registry = Registry::new();
        registry.get("/hello", |ctx: &mut Context<'_>| {
            ctx.send_text(StatusCode::OK, "hi");
            Ok(())
        });
        service.clone().reload(registry.build());

        let response = service.respond(get("/hello"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"hi");
    }
}
