//! # lenna
//!
//! **lenna** is a small HTTP request router: a segment trie that maps
//! `(method, path)` to a handler, and an onion-style middleware chain that
//! wraps each handler with cross-cutting behaviour.
//!
//! ## Overview
//!
//! The crate owns no sockets. A host server hands it a method and a path
//! (or a whole `http::Request`) and gets back a finished
//! `(status, headers, body)` triple.
//!
//! ## Architecture
//!
//! - **[`router`]** - `RouteTrie`: static and `:name` segments, O(segments) lookup
//! - **[`middleware`]** - `Middleware` trait, `MiddlewareChain` with its
//!   per-route cache, and the built-in middlewares
//! - **[`server`]** - `Request`, `Response` and the `http` crate adapter
//! - **[`app`]** - `Application`, which ties routes, middleware and config together
//! - **[`config`]** / **[`logging`]** - environment and TOML settings, tracing setup
//! - **[`cli`]** - the `lenna-routes` inspection tool
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host server
//!     participant App as Application
//!     participant Trie as RouteTrie
//!     participant Chain as MiddlewareChain
//!     participant Handler
//!
//!     Host->>App: handle_http(request)
//!     App->>Trie: lookup(method, path)
//!     Trie-->>App: RouteEntry + captures
//!     App->>Chain: fetch_or_build(route key)
//!     Chain-->>App: cached chain
//!     App->>Chain: run(request, response)
//!     Chain->>Handler: innermost call
//!     Handler-->>Chain: Outcome
//!     Chain-->>App: Outcome
//!     App-->>Host: finished response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use lenna::middleware::{ErrorHandler, Logging};
//! use lenna::{Application, Method, Request};
//!
//! # fn main() -> Result<(), lenna::RouterError> {
//! let mut app = Application::new();
//! app.use_middleware(Logging);
//! app.use_middleware(ErrorHandler::from_config(app.config()));
//!
//! app.get("/users/:id", |req, res| {
//!     res.json(&serde_json::json!({ "id": req.param_str("id") }))?;
//!     Ok(())
//! })?;
//! app.freeze();
//!
//! let res = app.call(Request::new(Method::Get, "/users/42")).unwrap();
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_string(), r#"{"id":"42"}"#);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Registration takes `&mut self`. After [`Application::freeze`] the
//! application is only read: share it in an `Arc` across request threads.
//! The chain cache is the only state written while serving and is
//! swapped atomically.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod method;
pub mod middleware;
pub mod router;
pub mod server;

pub use app::Application;
pub use error::{halt, BoxError, Interrupt, Outcome, RouterError};
pub use method::Method;
pub use router::{RouteMatch, RouteTrie};
pub use server::{FinishedResponse, Request, Response};
