//! Error types.
//!
//! Two families exist and they never mix:
//!
//! - [`RouterError`] is returned while the application is being assembled
//!   (route registration, freezing). These are programmer errors and are
//!   expected to abort startup.
//! - [`Interrupt`] travels back up the middleware chain while a request is
//!   being handled. It either carries a replacement response ([`Interrupt::Halt`])
//!   or a handler failure ([`Interrupt::Failed`]).
//!
//! A missing route is neither: matching simply returns `None`.

use std::fmt;

use thiserror::Error;

use crate::method::Method;
use crate::server::Response;

/// Boxed error carried by [`Interrupt::Failed`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registration-time failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The verb is not one of the seven supported methods.
    #[error("unsupported HTTP method `{0}`")]
    UnsupportedMethod(String),

    /// The same method and path were registered twice under
    /// [`DuplicatePolicy::Reject`](crate::router::DuplicatePolicy::Reject).
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    /// `add_route` was called after the table was frozen.
    #[error("cannot register {method} {path}: the route table is frozen")]
    Frozen { method: Method, path: String },

    /// A second, differently named capture was declared at a position that
    /// already has one.
    #[error("capture `:{requested}` in {path} conflicts with existing `:{existing}` at the same position")]
    ParamConflict {
        path: String,
        existing: String,
        requested: String,
    },

    /// The path could not be turned into segments.
    #[error("invalid route path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

/// Early exit from a middleware chain.
///
/// Returned through `Err` so every link unwinds with an ordinary `return`
/// rather than a non-local jump.
pub enum Interrupt {
    /// Stop processing and send this response as-is.
    Halt(Box<Response>),
    /// A handler or middleware failed.
    Failed(BoxError),
}

/// Result type returned by handlers, middleware and composed chains.
pub type Outcome = Result<(), Interrupt>;

impl Interrupt {
    /// Wrap anything convertible into a boxed error (including `&str`,
    /// `String` and `anyhow::Error`).
    pub fn fail(err: impl Into<BoxError>) -> Self {
        Interrupt::Failed(err.into())
    }

    /// Replace the in-flight response with `response`.
    #[must_use]
    pub fn halt(response: Response) -> Self {
        Interrupt::Halt(Box::new(response))
    }

    #[must_use]
    pub fn is_halt(&self) -> bool {
        matches!(self, Interrupt::Halt(_))
    }
}

/// Shorthand for `Err(Interrupt::halt(response))`.
///
/// ```rust
/// use lenna::{halt, Outcome, Request, Response};
///
/// fn guard(req: &Request, _res: &mut Response) -> Outcome {
///     if req.header("x-maintenance").is_some() {
///         let mut busy = Response::with_status(503);
///         busy.text("down for maintenance");
///         return halt(busy);
///     }
///     Ok(())
/// }
/// ```
pub fn halt(response: Response) -> Outcome {
    Err(Interrupt::halt(response))
}

impl<E> From<E> for Interrupt
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Interrupt::Failed(Box::new(err))
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Halt(res) => f.debug_tuple("Halt").field(&res.status()).finish(),
            Interrupt::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Halt(res) => write!(f, "halted with status {}", res.status()),
            Interrupt::Failed(err) => write!(f, "{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_number(s: &str) -> Outcome {
        let _n: u32 = s.parse()?;
        Ok(())
    }

    #[test]
    fn test_question_mark_converts_std_errors() {
        assert!(parse_number("12").is_ok());
        match parse_number("twelve") {
            Err(Interrupt::Failed(err)) => assert!(err.to_string().contains("invalid digit")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_fail_accepts_strings_and_anyhow() {
        let from_str = Interrupt::fail("boom");
        assert_eq!(from_str.to_string(), "boom");

        let from_anyhow = Interrupt::fail(anyhow::anyhow!("disk on fire"));
        assert_eq!(from_anyhow.to_string(), "disk on fire");
        assert!(!from_anyhow.is_halt());
    }

    #[test]
    fn test_halt_carries_response() {
        let outcome = halt(Response::with_status(302));
        match outcome {
            Err(Interrupt::Halt(res)) => assert_eq!(res.status(), 302),
            other => panic!("expected halt, got {other:?}"),
        }
    }

    #[test]
    fn test_router_error_messages() {
        let err = RouterError::DuplicateRoute {
            method: Method::Get,
            path: "/users/:id".to_string(),
        };
        assert_eq!(err.to_string(), "route GET /users/:id is already registered");
    }
}
