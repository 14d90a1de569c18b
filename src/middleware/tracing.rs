use std::time::Instant;

use tracing::{info, info_span, warn};

use super::Middleware;
use crate::context::Context;
use crate::dispatcher::DispatchMode;

/// Opens a `request` span for the rest of the pipeline.
///
/// In manual mode the span wraps the remaining middleware and the handler,
/// and the final status and latency are logged when the chain unwinds. In
/// automatic mode nothing runs after it returns, so only the arrival of the
/// request is logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let span = info_span!(
            "request",
            method = %ctx.method(),
            path = %ctx.path(),
            route_pattern = %ctx.route_pattern(),
            request_id = %ctx.request_id(),
        );
        let _guard = span.enter();

        if ctx.dispatch_mode() == DispatchMode::Automatic {
            info!("Request received");
            return Ok(());
        }

        let start = Instant::now();
        let result = ctx.next();
        let latency_us = start.elapsed().as_micros() as u64;
        let status = ctx.response().status().as_u16();

        match &result {
            Ok(()) => info!(status, latency_us, "Request completed"),
            Err(err) => warn!(status, latency_us, error = %err, "Request failed"),
        }
        result
    }
}
