//! # Middleware
//!
//! A middleware is a link wrapped around a route action. It receives the
//! request, the in-flight response and a [`Next`] for the rest of the
//! chain, and may:
//!
//! - run code before and after `next.run(req, res)`
//! - skip `next` entirely and answer on its own
//! - return [`halt`](crate::halt) to replace the response from anywhere
//!   inside the chain
//!
//! Chains are composed by [`MiddlewareChain`]: global middleware first, in
//! registration order, then the route's own, then the action.
//!
//! ## Built-ins
//!
//! | Middleware | Purpose |
//! |---|---|
//! | [`Logging`] | one `Request completed` event per request |
//! | [`ErrorHandler`] | failures and panics become a 500 page |
//! | [`RequestIdMiddleware`] | propagates or assigns `x-request-id` |
//! | [`AuthMiddleware`] | static token check, 401 otherwise |
//! | [`MetricsMiddleware`] | request, error and latency counters |

mod auth;
mod chain;
mod core;
mod error_handler;
mod logging;
mod metrics;
mod request_id;

pub use auth::AuthMiddleware;
pub use chain::{ChainKey, MiddlewareChain};
pub use core::{from_fn, handler, FnMiddleware, Handler, Middleware, MiddlewareEntry, Next};
pub use error_handler::{escape_html, ErrorHandler, MAX_DETAIL_CHARS};
pub use logging::Logging;
pub use metrics::MetricsMiddleware;
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
