use tracing::debug;

use super::core::{Middleware, Next};
use crate::error::{Interrupt, Outcome};
use crate::ids::RequestId;
use crate::server::{Request, Response};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Echoes the caller's `x-request-id` (or a generated ULID) on the
/// response, halted responses included.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestIdMiddleware {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        let id = RequestId::from_header_or_new(req.header(REQUEST_ID_HEADER));
        debug!(request_id = %id, path = %req.path(), "Request id assigned");

        match next.run(req, res) {
            Ok(()) => {
                res.replace_header(REQUEST_ID_HEADER, id.as_str());
                Ok(())
            }
            Err(Interrupt::Halt(mut halted)) => {
                halted.replace_header(REQUEST_ID_HEADER, id.as_str());
                Err(Interrupt::Halt(halted))
            }
            Err(failed) => Err(failed),
        }
    }

    fn name(&self) -> &'static str {
        "request_id"
    }
}
