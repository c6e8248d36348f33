//! Router core: registration, freezing and matching over the segment trie.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::error::RouterError;
use crate::method::Method;

use super::trie::RouteNode;

/// Maximum number of path captures stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured `(name, value)` pairs in path order.
///
/// Names are shared with the trie node that declared them, so collecting a
/// capture only allocates the value.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What to do when the same method and path are registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`RouterError::DuplicateRoute`].
    #[default]
    Reject,
    /// Replace the earlier handler.
    Overwrite,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" | "strict" => Ok(DuplicatePolicy::Reject),
            "overwrite" | "replace" => Ok(DuplicatePolicy::Overwrite),
            other => Err(format!("unknown duplicate route policy `{other}`")),
        }
    }
}

/// Successful lookup: the handler plus the captured path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub path_params: ParamVec,
}

impl<H> RouteMatch<'_, H> {
    /// Captured value for `name`.
    ///
    /// The single-dynamic-child rule means names can still repeat at
    /// different depths (`/a/:id/b/:id`); the deepest one wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Captures as an owned map. Allocates; prefer [`get_path_param`](Self::get_path_param).
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Split a path into its non-empty segments.
///
/// Leading, trailing and repeated slashes are ignored, so `"/a//b/"` and
/// `"a/b"` produce the same segments.
pub fn split_path(path: &str) -> SmallVec<[&str; 8]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical spelling of a path: `/` followed by its segments joined with `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in split_path(path) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Route table mapping `(Method, path)` to handlers of type `H`.
///
/// Built during a single-threaded startup phase and then [`freeze`](Self::freeze)d.
/// Matching takes `&self` and touches no interior mutability, so a frozen
/// trie can be shared across threads behind an `Arc` without locking.
///
/// # Example
///
/// ```rust
/// use lenna::router::RouteTrie;
///
/// let mut trie = RouteTrie::new();
/// trie.add_route("GET", "/users/:id", "show_user").unwrap();
/// trie.freeze();
///
/// let m = trie.match_route("GET", "/users/42").unwrap();
/// assert_eq!(*m.handler, "show_user");
/// assert_eq!(m.get_path_param("id"), Some("42"));
/// assert!(trie.add_route("GET", "/late", "nope").is_err());
/// ```
pub struct RouteTrie<H> {
    root: RouteNode<H>,
    policy: DuplicatePolicy,
    frozen: bool,
    /// Registration order, for introspection
    patterns: Vec<(Method, String)>,
}

impl<H> Default for RouteTrie<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for RouteTrie<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTrie")
            .field("policy", &self.policy)
            .field("frozen", &self.frozen)
            .field("routes", &self.patterns)
            .finish()
    }
}

impl<H> RouteTrie<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            root: RouteNode::default(),
            policy,
            frozen: false,
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register `handler` for a method token and path pattern.
    ///
    /// The method is parsed case-insensitively; anything outside the seven
    /// supported verbs fails with [`RouterError::UnsupportedMethod`].
    pub fn add_route(&mut self, method: &str, path: &str, handler: H) -> Result<(), RouterError> {
        let method: Method = method.parse()?;
        self.insert(method, path, handler).map(|_| ())
    }

    /// Register `handler` for an already parsed method.
    ///
    /// Returns the replaced handler when the policy is
    /// [`DuplicatePolicy::Overwrite`] and the route already existed.
    pub fn insert(&mut self, method: Method, path: &str, handler: H) -> Result<Option<H>, RouterError> {
        let pattern = normalize_path(path);

        if self.frozen {
            return Err(RouterError::Frozen {
                method,
                path: pattern,
            });
        }

        let segments = split_path(path);
        if segments.iter().any(|s| *s == ":") {
            return Err(RouterError::InvalidPath {
                path: pattern,
                reason: "capture segment has an empty name",
            });
        }

        let replaced = self
            .root
            .insert(&segments, method, handler, self.policy, &pattern)?;

        if replaced.is_some() {
            info!(method = %method, path = %pattern, "Route handler replaced");
        } else {
            debug!(method = %method, path = %pattern, "Route registered");
            self.patterns.push((method, pattern));
        }

        Ok(replaced)
    }

    /// Resolve a method token and request path.
    ///
    /// Unknown verbs, unknown paths and known paths without a handler for
    /// the method all yield `None`.
    #[must_use]
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch<'_, H>> {
        let method: Method = method.parse().ok()?;
        self.lookup(method, path)
    }

    /// Resolve an already parsed method and request path.
    #[must_use]
    pub fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch<'_, H>> {
        let segments = split_path(path);
        let mut path_params = ParamVec::new();

        let handler = self.root.search(&segments, method, &mut path_params);
        debug!(
            method = %method,
            path = %path,
            matched = handler.is_some(),
            "Route match attempt"
        );

        handler.map(|handler| RouteMatch {
            handler,
            path_params,
        })
    }

    /// Reject all further registration.
    pub fn freeze(&mut self) {
        if !self.frozen {
            info!(routes_count = self.patterns.len(), "Route table frozen");
        }
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registered `(method, normalized pattern)` pairs in registration order.
    #[must_use]
    pub fn routes(&self) -> &[(Method, String)] {
        &self.patterns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Every stored handler, in no particular order.
    #[must_use]
    pub fn values(&self) -> Vec<(Method, &H)> {
        let mut out = Vec::with_capacity(self.patterns.len());
        self.root.for_each_handler(&mut |method, h| out.push((method, h)));
        out
    }

    /// Root of the trie, for inspection.
    #[must_use]
    pub fn root(&self) -> &RouteNode<H> {
        &self.root
    }
}
