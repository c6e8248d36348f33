//! Segment trie used by [`RouteTrie`](super::RouteTrie).
//!
//! Each node represents one `/`-delimited path segment:
//! - Static edges are keyed by the literal segment text (case-sensitive)
//! - At most one dynamic edge per node, reached by any segment; the child
//!   remembers the capture name it binds (`:id` -> `id`)
//! - Handlers live on the node a full path ends at, keyed by [`Method`]
//!
//! Lookup walks one edge per segment and never backtracks: a literal child
//! is always taken when it exists, even if the dynamic sibling would have
//! led to a match deeper down.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RouterError;
use crate::method::Method;

use super::core::{DuplicatePolicy, ParamVec};

/// Node in the route trie.
pub struct RouteNode<H> {
    /// Literal segment -> child
    static_children: HashMap<Box<str>, RouteNode<H>>,
    /// Child reached by any segment when no literal child matches
    dynamic_child: Option<Box<RouteNode<H>>>,
    /// Capture name bound when entering this node through a dynamic edge
    param_key: Option<Arc<str>>,
    handlers: HashMap<Method, H>,
}

impl<H> Default for RouteNode<H> {
    fn default() -> Self {
        Self {
            static_children: HashMap::new(),
            dynamic_child: None,
            param_key: None,
            handlers: HashMap::new(),
        }
    }
}

impl<H> RouteNode<H> {
    fn new_param(name: &str) -> Self {
        Self {
            param_key: Some(Arc::from(name)),
            ..Self::default()
        }
    }

    /// Capture name bound by this node, `None` for static nodes and the root.
    #[must_use]
    pub fn param_key(&self) -> Option<&str> {
        self.param_key.as_deref()
    }

    /// Handler registered on this node for `method`.
    #[must_use]
    pub fn handler(&self, method: Method) -> Option<&H> {
        self.handlers.get(&method)
    }

    /// Methods with a handler on this node.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.handlers.keys().copied()
    }

    #[must_use]
    pub fn static_child(&self, segment: &str) -> Option<&RouteNode<H>> {
        self.static_children.get(segment)
    }

    #[must_use]
    pub fn dynamic_child(&self) -> Option<&RouteNode<H>> {
        self.dynamic_child.as_deref()
    }

    /// Walk (creating as needed) to the node for `segments` and store
    /// `handler` there.
    ///
    /// Returns the handler that was replaced, which can only happen under
    /// [`DuplicatePolicy::Overwrite`].
    pub(super) fn insert(
        &mut self,
        segments: &[&str],
        method: Method,
        handler: H,
        policy: DuplicatePolicy,
        pattern: &str,
    ) -> Result<Option<H>, RouterError> {
        let mut node = self;

        for segment in segments {
            node = match segment.strip_prefix(':') {
                Some(name) => {
                    let child = node
                        .dynamic_child
                        .get_or_insert_with(|| Box::new(RouteNode::new_param(name)));
                    if let Some(existing) = child.param_key.as_deref() {
                        if existing != name {
                            return Err(RouterError::ParamConflict {
                                path: pattern.to_string(),
                                existing: existing.to_string(),
                                requested: name.to_string(),
                            });
                        }
                    }
                    &mut **child
                }
                None => node
                    .static_children
                    .entry(Box::from(*segment))
                    .or_default(),
            };
        }

        match node.handlers.entry(method) {
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(None)
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::Reject => Err(RouterError::DuplicateRoute {
                    method,
                    path: pattern.to_string(),
                }),
                DuplicatePolicy::Overwrite => Ok(Some(slot.insert(handler))),
            },
        }
    }

    /// Resolve `segments` to a handler, collecting captures into `params`.
    pub(super) fn search<'a>(
        &'a self,
        segments: &[&str],
        method: Method,
        params: &mut ParamVec,
    ) -> Option<&'a H> {
        let mut node = self;

        for segment in segments {
            if let Some(child) = node.static_children.get(*segment) {
                node = child;
            } else if let Some(child) = node.dynamic_child.as_deref() {
                if let Some(key) = &child.param_key {
                    params.push((Arc::clone(key), (*segment).to_string()));
                }
                node = child;
            } else {
                return None;
            }
        }

        node.handlers.get(&method)
    }

    /// Visit every handler in the subtree.
    pub(super) fn for_each_handler<'a>(&'a self, visit: &mut dyn FnMut(Method, &'a H)) {
        for (method, handler) in &self.handlers {
            visit(*method, handler);
        }
        for child in self.static_children.values() {
            child.for_each_handler(visit);
        }
        if let Some(child) = self.dynamic_child.as_deref() {
            child.for_each_handler(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(root: &mut RouteNode<&'static str>, method: Method, path: &str, h: &'static str) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        root.insert(&segments, method, h, DuplicatePolicy::Reject, path)
            .unwrap();
    }

    #[test]
    fn test_static_and_dynamic_edges_created_lazily() {
        let mut root = RouteNode::default();
        insert(&mut root, Method::Get, "/users/:id", "show");

        let users = root.static_child("users").unwrap();
        assert!(users.param_key().is_none());
        let id = users.dynamic_child().unwrap();
        assert_eq!(id.param_key(), Some("id"));
        assert_eq!(id.handler(Method::Get), Some(&"show"));
        assert!(id.handler(Method::Post).is_none());
    }

    #[test]
    fn test_same_capture_name_reuses_dynamic_child() {
        let mut root = RouteNode::default();
        insert(&mut root, Method::Get, "/users/:id", "show");
        insert(&mut root, Method::Get, "/users/:id/posts", "posts");

        let id = root.static_child("users").unwrap().dynamic_child().unwrap();
        assert!(id.static_child("posts").is_some());
    }

    #[test]
    fn test_no_backtracking_after_static_choice() {
        let mut root = RouteNode::default();
        insert(&mut root, Method::Get, "/foo/:id/bar", "dynamic");
        insert(&mut root, Method::Get, "/foo/baz/qux", "static");

        let mut params = ParamVec::new();
        // "baz" commits to the static edge; "bar" does not exist below it.
        assert!(root
            .search(&["foo", "baz", "bar"], Method::Get, &mut params)
            .is_none());

        let mut params = ParamVec::new();
        assert_eq!(
            root.search(&["foo", "other", "bar"], Method::Get, &mut params),
            Some(&"dynamic")
        );
        assert_eq!(params[0].0.as_ref(), "id");
        assert_eq!(params[0].1, "other");
    }

    #[test]
    fn test_for_each_handler_visits_all() {
        let mut root = RouteNode::default();
        insert(&mut root, Method::Get, "/", "root");
        insert(&mut root, Method::Get, "/a", "a");
        insert(&mut root, Method::Post, "/a/:x", "ax");

        let mut seen = Vec::new();
        root.for_each_handler(&mut |method, h| seen.push((method, *h)));
        seen.sort();
        assert_eq!(
            seen,
            vec![(Method::Get, "a"), (Method::Get, "root"), (Method::Post, "ax")]
        );
    }
}
