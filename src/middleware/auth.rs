use tracing::warn;

use super::core::{Middleware, Next};
use crate::error::{halt, Outcome};
use crate::server::{Request, Response};

/// Static bearer-token check.
///
/// Requests whose `authorization` header is not exactly the configured
/// token are answered with `401 {"error":"Unauthorized"}` and never reach
/// the inner chain.
pub struct AuthMiddleware {
    token: String,
}

impl AuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn unauthorized() -> Response {
        let mut res = Response::with_status(401);
        res.replace_header("content-type", "application/json");
        res.write(r#"{"error":"Unauthorized"}"#);
        res
    }
}

impl Middleware for AuthMiddleware {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        match req.header("authorization") {
            Some(h) if h == self.token => next.run(req, res),
            presented => {
                warn!(
                    method = %req.method(),
                    path = %req.path(),
                    header_present = presented.is_some(),
                    "Authorization rejected"
                );
                halt(Self::unauthorized())
            }
        }
    }

    fn name(&self) -> &'static str {
        "auth"
    }
}

impl std::fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddleware")
            .field("token", &"<redacted>")
            .finish()
    }
}
