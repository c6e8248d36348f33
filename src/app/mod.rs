//! # Application
//!
//! [`Application`] ties the pieces together: a [`RouteTrie`](crate::router::RouteTrie)
//! of [`RouteEntry`] values, the [`MiddlewareChain`](crate::middleware::MiddlewareChain)
//! that wraps them, a namespace prefix stack and the [`AppConfig`](crate::config::AppConfig).
//!
//! ## Request flow
//!
//! 1. The request's method and path are looked up in the trie
//! 2. On a match, the captures are attached to the request and the route's
//!    cached chain (global middleware, route middleware, action) runs
//! 3. Otherwise the global middleware runs around the not-found action
//! 4. Before hooks run ahead of that chain and after hooks behind it
//!    (see [`hooks`])
//! 5. The response (or the halted replacement) is finished and returned

mod core;
pub mod hooks;

pub use core::{Application, RouteEntry};
