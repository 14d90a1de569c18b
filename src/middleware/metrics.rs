use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::Middleware;
use crate::context::Context;
use crate::dispatcher::DispatchMode;

/// Lock-free request counters.
///
/// Register it through an `Arc` so the counters stay readable after the
/// registry has been built:
///
/// ```rust,ignore
/// let metrics = Arc::new(MetricsMiddleware::new());
/// registry.attach("/", Arc::clone(&metrics));
/// // later
/// println!("{} requests", metrics.request_count());
/// ```
///
/// Latency and errors can only be observed in manual mode, where the
/// middleware wraps the rest of the chain through [`Context::next`].
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    timed_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    stack_size: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of requests that reached this middleware
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests whose downstream chain returned an error
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Mean time spent in the downstream chain.
    ///
    /// Returns zero duration if no request has been timed yet.
    pub fn average_latency(&self) -> Duration {
        let count = self.timed_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Stack size of the coroutine that served the latest request.
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }

    fn record_stack(&self) {
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.record_stack();

        if ctx.dispatch_mode() == DispatchMode::Automatic {
            return Ok(());
        }

        let start = Instant::now();
        let result = ctx.next();
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        self.timed_count.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}
