use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::info;

use super::core::{Middleware, Next};
use crate::error::{Interrupt, Outcome};
use crate::server::{Request, Response};

/// Logs one `Request completed` event per request with method, path,
/// status and duration.
///
/// The event is emitted after the inner chain returns, whatever it
/// returned; the outcome is passed through unchanged. A failure that is
/// still unhandled at this point is logged with status 500. So is a panic,
/// which is logged and then resumed for an outer
/// [`ErrorHandler`](super::ErrorHandler) or the host to deal with.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logging;

impl Logging {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn completed(req: &Request, start: Instant, status: u16, halted: bool, failed: bool) {
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        method = %req.method(),
        path = %req.path(),
        status,
        duration_ms,
        halted,
        failed,
        "Request completed"
    );
}

impl Middleware for Logging {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        let start = Instant::now();

        let outcome = match catch_unwind(AssertUnwindSafe(|| next.run(req, res))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                completed(req, start, 500, false, true);
                resume_unwind(payload);
            }
        };

        let (status, halted, failed) = match &outcome {
            Ok(()) => (res.status(), false, false),
            Err(Interrupt::Halt(halted)) => (halted.status(), true, false),
            Err(Interrupt::Failed(_)) => (500, false, true),
        };
        completed(req, start, status, halted, failed);

        outcome
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
