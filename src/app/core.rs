use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::error::{Interrupt, Outcome, RouterError};
use crate::method::Method;
use crate::middleware::{handler, ChainKey, Handler, MiddlewareChain, MiddlewareEntry};
use crate::router::{normalize_path, RouteMatch, RouteTrie};
use crate::server::{FinishedResponse, Request, Response};

use super::hooks::{Hooks, ALL_PATHS};

/// What the route trie stores for each registered route.
#[derive(Clone)]
pub struct RouteEntry {
    key: ChainKey,
    action: Handler,
    middlewares: Arc<[MiddlewareEntry]>,
}

impl RouteEntry {
    /// Chain cache key for this route.
    #[must_use]
    pub fn key(&self) -> &ChainKey {
        &self.key
    }

    #[must_use]
    pub fn action(&self) -> &Handler {
        &self.action
    }

    /// Route-local middleware, in declaration order.
    #[must_use]
    pub fn middlewares(&self) -> &[MiddlewareEntry] {
        &self.middlewares
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("key", &self.key)
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

/// Routes, middleware and settings for one application.
///
/// Register everything with `&mut self`, call [`freeze`](Self::freeze), then
/// share the application (e.g. in an `Arc`) and serve requests through
/// [`call`](Self::call) or [`handle_http`](Self::handle_http).
///
/// ```rust
/// use lenna::middleware::Logging;
/// use lenna::{Application, Method, Request};
///
/// let mut app = Application::new();
/// app.use_middleware(Logging);
/// app.get("/users/:id", |req, res| {
///     res.text(&format!("user {}", req.param_str("id").unwrap_or_default()));
///     Ok(())
/// })
/// .unwrap();
/// app.freeze();
///
/// let res = app.call(Request::new(Method::Get, "/users/42")).unwrap();
/// assert_eq!(res.status, 200);
/// assert_eq!(res.body_string(), "user 42");
/// ```
pub struct Application {
    routes: RouteTrie<RouteEntry>,
    middleware: MiddlewareChain,
    namespaces: Vec<String>,
    config: AppConfig,
    not_found: Handler,
    hooks: Hooks,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware)
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

macro_rules! verb_methods {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&mut self, path: &str, action: F) -> Result<(), RouterError>
            where
                F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
            {
                self.register($method, path, Vec::new(), handler(action))
            }
        )*
    };
}

impl Application {
    /// Application with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    #[must_use]
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            routes: RouteTrie::with_policy(config.duplicate_routes),
            middleware: MiddlewareChain::new(),
            namespaces: Vec::new(),
            config,
            not_found: handler(|_req, res| {
                res.not_found();
                Ok(())
            }),
            hooks: Hooks::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    verb_methods! {
        /// Register a `GET` route.
        get => Method::Get;
        /// Register a `POST` route.
        post => Method::Post;
        /// Register a `PUT` route.
        put => Method::Put;
        /// Register a `PATCH` route.
        patch => Method::Patch;
        /// Register a `DELETE` route.
        delete => Method::Delete;
        /// Register a `HEAD` route.
        head => Method::Head;
        /// Register an `OPTIONS` route.
        options => Method::Options;
    }

    /// `GET /`, relative to the current namespace.
    pub fn root<F>(&mut self, action: F) -> Result<(), RouterError>
    where
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        self.get("/", action)
    }

    /// Register a route for a method token (`"get"`, `"POST"`, ...).
    pub fn route<F>(&mut self, method: &str, path: &str, action: F) -> Result<(), RouterError>
    where
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        self.route_with(method, path, Vec::<MiddlewareEntry>::new(), action)
    }

    /// Register a route with its own middleware, which runs inside the
    /// global middleware in the order given.
    pub fn route_with<I, F>(
        &mut self,
        method: &str,
        path: &str,
        middlewares: I,
        action: F,
    ) -> Result<(), RouterError>
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareEntry>,
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        let method: Method = method.parse()?;
        let middlewares: Vec<MiddlewareEntry> = middlewares.into_iter().map(Into::into).collect();
        self.register(method, path, middlewares, handler(action))
    }

    fn register(
        &mut self,
        method: Method,
        path: &str,
        middlewares: Vec<MiddlewareEntry>,
        action: Handler,
    ) -> Result<(), RouterError> {
        let full_path = self.prefixed(path);
        let key = ChainKey::route(method, &full_path);
        let entry = RouteEntry {
            key: key.clone(),
            action,
            middlewares: middlewares.into(),
        };

        if self.routes.insert(method, &full_path, entry)?.is_some() {
            self.middleware.invalidate(&key);
        }
        Ok(())
    }

    /// Register routes under `prefix`.
    ///
    /// Namespaces nest: inside `namespace("/api", ..)`, `namespace("/v1", ..)`
    /// registers under `/api/v1`. The prefix is popped even when `routes`
    /// fails.
    pub fn namespace<F>(&mut self, prefix: &str, routes: F) -> Result<(), RouterError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouterError>,
    {
        let joined = self.prefixed(prefix);
        debug!(prefix = %joined, "Entering namespace");
        self.namespaces.push(joined);
        let result = routes(self);
        self.namespaces.pop();
        result
    }

    /// `path` under the current namespace, normalized.
    fn prefixed(&self, path: &str) -> String {
        match self.namespaces.last() {
            Some(prefix) => normalize_path(&format!("{prefix}/{path}")),
            None => normalize_path(path),
        }
    }

    fn hook_pattern(&self, pattern: &str) -> Option<String> {
        (pattern.trim() != ALL_PATHS).then(|| self.prefixed(pattern))
    }

    /// Run `hook` before the chain of every request whose path matches
    /// `pattern` (`"*"` for all requests, `:name` segments match anything).
    ///
    /// Hooks run outside all middleware, for unmatched paths too. A halt
    /// from a hook becomes the response; a failure is returned like an
    /// unhandled one. Patterns are relative to the current namespace.
    pub fn before<F>(&mut self, pattern: &str, hook: F)
    where
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        let pattern = self.hook_pattern(pattern);
        debug!(pattern = pattern.as_deref().unwrap_or(ALL_PATHS), "Before hook added");
        self.hooks.add_before(pattern, handler(hook));
    }

    /// Run `hook` after the chain of every request whose path matches
    /// `pattern`. Skipped when anything before it halted or failed.
    pub fn after<F>(&mut self, pattern: &str, hook: F)
    where
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        let pattern = self.hook_pattern(pattern);
        debug!(pattern = pattern.as_deref().unwrap_or(ALL_PATHS), "After hook added");
        self.hooks.add_after(pattern, handler(hook));
    }

    /// Append a global middleware. Applies to every route, including ones
    /// registered earlier, and to not-found responses.
    pub fn use_middleware(&mut self, middleware: impl Into<MiddlewareEntry>) {
        self.middleware.use_middleware(middleware);
    }

    /// Replace the action run when no route matches.
    pub fn set_not_found<F>(&mut self, action: F)
    where
        F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
    {
        self.not_found = handler(action);
        self.middleware.invalidate(&ChainKey::Global);
    }

    /// Stop accepting routes and build every chain up front.
    pub fn freeze(&mut self) {
        self.routes.freeze();
        for (_, entry) in self.routes.values() {
            let _chain = self
                .middleware
                .fetch_or_build(&entry.key, &entry.action, &entry.middlewares);
        }
        let _chain = self
            .middleware
            .fetch_or_build(&ChainKey::Global, &self.not_found, &[]);
        info!(
            routes_count = self.routes.len(),
            global_middleware = self.middleware.global().len(),
            "Application frozen"
        );
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.routes.is_frozen()
    }

    /// Registered `(method, pattern)` pairs in registration order.
    #[must_use]
    pub fn routes(&self) -> &[(Method, String)] {
        self.routes.routes()
    }

    #[must_use]
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch<'_, RouteEntry>> {
        self.routes.match_route(method, path)
    }

    #[must_use]
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Route `req` and run its chain inside the before/after hooks.
    ///
    /// Unmatched requests run the global middleware around the not-found
    /// action. A halt becomes the finished response. A failure nobody
    /// handled is returned as `Err`.
    pub fn call(&self, mut req: Request) -> Result<FinishedResponse, Interrupt> {
        let mut res = Response::new();

        let chain = match self.routes.lookup(req.method(), req.path()) {
            Some(RouteMatch {
                handler: entry,
                path_params,
            }) => {
                req.set_path_params(path_params);
                self.middleware
                    .fetch_or_build(&entry.key, &entry.action, &entry.middlewares)
            }
            None => self
                .middleware
                .fetch_or_build(&ChainKey::Global, &self.not_found, &[]),
        };
        let outcome = self.hooks.run(&req, &mut res, &chain);

        match outcome {
            Ok(()) => Ok(res.finish()),
            Err(Interrupt::Halt(halted)) => Ok(halted.finish()),
            Err(failed) => Err(failed),
        }
    }

    /// Serve an `http` request end to end.
    ///
    /// Unsupported methods get the not-found response without running any
    /// middleware. Unhandled failures and unrepresentable responses become a
    /// bare 500.
    #[must_use]
    pub fn handle_http(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let finished = match Request::from_http(req) {
            Ok(req) => self.call(req),
            Err(e) => {
                debug!(method = %method, path = %path, error = %e, "Unsupported method");
                let mut res = Response::new();
                res.not_found();
                Ok(res.finish())
            }
        };

        let converted = match finished {
            Ok(finished) => finished.into_http().map_err(|e| e.to_string()),
            Err(failed) => Err(failed.to_string()),
        };

        converted.unwrap_or_else(|error| {
            error!(method = %method, path = %path, error = %error, "Unhandled request failure");
            internal_server_error()
        })
    }
}

fn internal_server_error() -> http::Response<Vec<u8>> {
    let body = b"Internal Server Error".to_vec();
    let length = http::HeaderValue::from(body.len());
    let mut res = http::Response::new(body);
    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res.headers_mut().insert(http::header::CONTENT_LENGTH, length);
    res
}
