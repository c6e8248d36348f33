//! # Router Module
//!
//! Maps `(method, path)` pairs to handlers with a segment trie.
//!
//! ## Path syntax
//!
//! - Segments are separated by `/`; empty segments are dropped, so leading,
//!   trailing and doubled slashes never matter
//! - A segment written `:name` captures whatever segment appears at that
//!   position under the key `name`
//! - Any other segment matches literally and case-sensitively
//!
//! ## Matching
//!
//! Lookup is O(segments). At every level a literal child wins over the
//! capture child, and the choice is never revisited: with `/foo/:id/bar`
//! and `/foo/baz/qux` registered, `/foo/baz/bar` is not found.
//!
//! A path that exists but has no handler for the method is reported exactly
//! like an unknown path (`None`).
//!
//! ## Lifecycle
//!
//! Routes are added during startup, then [`RouteTrie::freeze`] makes the
//! table read-only. A frozen trie is shared between request threads
//! without locks.

mod core;
mod trie;

pub use core::{
    normalize_path, split_path, DuplicatePolicy, ParamVec, RouteMatch, RouteTrie, MAX_INLINE_PARAMS,
};
pub use trie::RouteNode;
