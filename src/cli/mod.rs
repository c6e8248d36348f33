//! # CLI Module
//!
//! Backs the `lenna-routes` binary, which loads a TOML route table into a
//! [`RouteTrie`](crate::router::RouteTrie) and either lists it or resolves a
//! single request against it.
//!
//! ## Commands
//!
//! ```bash
//! lenna-routes routes --table routes.toml
//! lenna-routes match --table routes.toml GET /users/42
//! ```
//!
//! `match` prints the handler name followed by `name=value` for each
//! capture, or `no match`.

mod commands;

pub use commands::{
    build_trie, format_match, format_routes, run_cli, Cli, Commands, RouteSpec, RouteTable,
};
