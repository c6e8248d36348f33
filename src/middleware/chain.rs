//! Composition and caching of middleware chains.
//!
//! A chain is the global middleware list followed by a route's own list,
//! wrapped around the route action onion-style: the first global
//! middleware is the outermost link and the action is the innermost.
//!
//! Composed chains are memoized per [`ChainKey`]. The cache is an immutable
//! map behind an [`ArcSwap`]: lookups are a single atomic load, and a miss
//! publishes a new map with the extra entry. Two threads missing on the
//! same key may both build; the first published chain is kept and handed
//! to both.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::method::Method;
use crate::server::{Request, Response};

use super::core::{Handler, MiddlewareEntry, Next};

/// Identity of a cached chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainKey {
    /// Global middleware around a fallback action (e.g. not-found).
    Global,
    /// A registered route, by normalized pattern.
    Route { method: Method, path: Arc<str> },
}

impl ChainKey {
    pub fn route(method: Method, path: &str) -> Self {
        ChainKey::Route {
            method,
            path: Arc::from(path),
        }
    }
}

/// Global middleware list plus the composed-chain cache.
pub struct MiddlewareChain {
    global: Vec<MiddlewareEntry>,
    cache: ArcSwap<HashMap<ChainKey, Handler>>,
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("global", &self.global)
            .field("cached", &self.cached_len())
            .finish()
    }
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self {
            global: Vec::new(),
            cache: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Append a global middleware. Every cached chain is dropped.
    pub fn use_middleware(&mut self, middleware: impl Into<MiddlewareEntry>) {
        let entry = middleware.into();
        debug!(middleware = entry.name(), "Global middleware added");
        self.global.push(entry);
        self.clear_cache();
    }

    /// Append several global middlewares in order.
    pub fn use_all<I>(&mut self, middlewares: I)
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareEntry>,
    {
        self.global
            .extend(middlewares.into_iter().map(Into::into));
        self.clear_cache();
    }

    #[must_use]
    pub fn global(&self) -> &[MiddlewareEntry] {
        &self.global
    }

    /// Compose `global ++ route` around `action`, outermost first.
    ///
    /// Entries are not deduplicated: a middleware listed twice runs twice.
    #[must_use]
    pub fn build_chain(&self, action: &Handler, route: &[MiddlewareEntry]) -> Handler {
        let mut chain: Handler = Arc::clone(action);

        for entry in self.global.iter().chain(route).rev() {
            let inner = chain;
            let middleware = entry.clone();
            chain = Arc::new(move |req: &Request, res: &mut Response| {
                middleware.call(req, res, Next::new(&*inner))
            });
        }

        chain
    }

    /// Cached chain for `key`, building it on first use.
    pub fn fetch_or_build(
        &self,
        key: &ChainKey,
        action: &Handler,
        route: &[MiddlewareEntry],
    ) -> Handler {
        if let Some(chain) = self.cache.load().get(key) {
            return Arc::clone(chain);
        }

        let built = self.build_chain(action, route);
        let mut stored = None;
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            let winner = next
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(&built));
            stored = Some(Arc::clone(winner));
            next
        });
        debug!(key = ?key, "Middleware chain built");

        stored.unwrap_or(built)
    }

    /// Drop the cached chain for one key.
    pub fn invalidate(&self, key: &ChainKey) {
        if !self.cache.load().contains_key(key) {
            return;
        }
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(key);
            next
        });
    }

    /// Drop every cached chain.
    pub fn clear_cache(&self) {
        self.cache.store(Arc::new(HashMap::new()));
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.load().len()
    }

    /// Whether a chain for `key` is cached.
    #[must_use]
    pub fn is_cached(&self, key: &ChainKey) -> bool {
        self.cache.load().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{halt, Interrupt, Outcome};
    use crate::middleware::core::handler;
    use crate::middleware::from_fn;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn marker(trace: &Trace, label: &'static str) -> MiddlewareEntry {
        let trace = Arc::clone(trace);
        from_fn(move |req: &Request, res: &mut Response, next: Next<'_>| {
            trace.lock().unwrap().push(format!("{label}-before"));
            let outcome = next.run(req, res);
            trace.lock().unwrap().push(format!("{label}-after"));
            outcome
        })
        .into()
    }

    fn action(trace: &Trace) -> Handler {
        let trace = Arc::clone(trace);
        handler(move |_req, res| {
            trace.lock().unwrap().push("action".to_string());
            res.text("done");
            Ok(())
        })
    }

    fn run(chain: &Handler) -> (Outcome, Response) {
        let req = Request::new(Method::Get, "/");
        let mut res = Response::new();
        let outcome = chain(&req, &mut res);
        (outcome, res)
    }

    #[test]
    fn test_empty_chain_is_the_action() {
        let trace = Trace::default();
        let chains = MiddlewareChain::new();
        let action = action(&trace);
        let chain = chains.build_chain(&action, &[]);
        assert!(Arc::ptr_eq(&chain, &action));
    }

    #[test]
    fn test_global_wraps_route_middleware() {
        let trace = Trace::default();
        let mut chains = MiddlewareChain::new();
        chains.use_middleware(marker(&trace, "A"));
        chains.use_middleware(marker(&trace, "B"));

        let chain = chains.build_chain(&action(&trace), &[marker(&trace, "C")]);
        let (outcome, _) = run(&chain);
        assert!(outcome.is_ok());

        assert_eq!(
            *trace.lock().unwrap(),
            [
                "A-before", "B-before", "C-before", "action", "C-after", "B-after", "A-after"
            ]
        );
    }

    #[test]
    fn test_same_middleware_twice_runs_twice() {
        let trace = Trace::default();
        let mut chains = MiddlewareChain::new();
        let a = marker(&trace, "A");
        chains.use_middleware(a.clone());

        let chain = chains.build_chain(&action(&trace), &[a]);
        let _ = run(&chain);
        assert_eq!(trace.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_halt_unwinds_through_outer_links() {
        let trace = Trace::default();
        let mut chains = MiddlewareChain::new();
        chains.use_middleware(marker(&trace, "A"));
        chains.use_middleware(from_fn(|_req: &Request, _res: &mut Response, _next: Next<'_>| {
            halt(Response::with_status(401))
        }));

        let chain = chains.build_chain(&action(&trace), &[]);
        let (outcome, _) = run(&chain);

        assert!(matches!(outcome, Err(Interrupt::Halt(ref r)) if r.status() == 401));
        assert_eq!(*trace.lock().unwrap(), ["A-before", "A-after"]);
    }

    #[test]
    fn test_fetch_or_build_reuses_chain() {
        let trace = Trace::default();
        let mut chains = MiddlewareChain::new();
        chains.use_middleware(marker(&trace, "A"));
        let key = ChainKey::route(Method::Get, "/users/:id");
        let action = action(&trace);

        let first = chains.fetch_or_build(&key, &action, &[]);
        let second = chains.fetch_or_build(&key, &action, &[]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(chains.cached_len(), 1);

        chains.use_middleware(marker(&trace, "B"));
        assert_eq!(chains.cached_len(), 0);
        let third = chains.fetch_or_build(&key, &action, &[]);
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_keys_are_independent() {
        let trace = Trace::default();
        let chains = MiddlewareChain::new();
        let action = action(&trace);
        let get = ChainKey::route(Method::Get, "/a");
        let post = ChainKey::route(Method::Post, "/a");

        let _ = chains.fetch_or_build(&get, &action, &[]);
        let _ = chains.fetch_or_build(&post, &action, &[]);
        let _ = chains.fetch_or_build(&ChainKey::Global, &action, &[]);
        assert_eq!(chains.cached_len(), 3);

        chains.invalidate(&get);
        assert!(!chains.is_cached(&get));
        assert!(chains.is_cached(&post));
    }

    #[test]
    fn test_concurrent_fetch_agrees_on_one_chain() {
        let trace = Trace::default();
        let mut chains = MiddlewareChain::new();
        chains.use_middleware(marker(&trace, "A"));
        let chains = Arc::new(chains);
        let action = action(&trace);
        let key = ChainKey::route(Method::Get, "/race");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let chains = Arc::clone(&chains);
                let action = Arc::clone(&action);
                let key = key.clone();
                std::thread::spawn(move || chains.fetch_or_build(&key, &action, &[]))
            })
            .collect();

        let results: Vec<Handler> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = chains.fetch_or_build(&key, &action, &[]);
        for chain in &results {
            assert!(Arc::ptr_eq(chain, &cached));
        }
        assert_eq!(chains.cached_len(), 1);
    }
}
