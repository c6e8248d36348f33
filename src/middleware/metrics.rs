use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::core::{Middleware, Next};
use crate::error::{Interrupt, Outcome};
use crate::server::{Request, Response};

/// In-process request counters.
///
/// Counts every request that reaches it, the ones that ended with a 5xx
/// (or an unhandled failure), and the total time spent inside it. Wrap it
/// in an `Arc` before registering to keep a handle for reading.
///
/// ```rust
/// use std::sync::Arc;
/// use lenna::middleware::MetricsMiddleware;
/// use lenna::Application;
///
/// let metrics = Arc::new(MetricsMiddleware::new());
/// let mut app = Application::new();
/// app.use_middleware(Arc::clone(&metrics));
/// assert_eq!(metrics.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests that ended with status >= 500 or an unhandled failure.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Mean time spent inside this middleware, zero before the first request.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        let start = Instant::now();
        let outcome = next.run(req, res);
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let is_error = match &outcome {
            Ok(()) => res.status() >= 500,
            Err(Interrupt::Halt(halted)) => halted.status() >= 500,
            Err(Interrupt::Failed(_)) => true,
        };

        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);
        if is_error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}
