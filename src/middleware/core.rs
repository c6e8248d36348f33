use std::sync::Arc;

use crate::error::Outcome;
use crate::server::{Request, Response};

/// Terminal action or composed chain: `(request, response) -> outcome`.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> Outcome + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Request, &mut Response) -> Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A link in a middleware chain.
///
/// Implementations run code before and/or after calling [`Next::run`], or
/// return without calling it to short-circuit everything inside them.
pub trait Middleware: Send + Sync {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome;

    /// Name used in logs and `Debug` output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        (**self).call(req, res, next)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// The rest of the chain, as seen from one middleware.
///
/// Consumed by [`run`](Self::run), so it can be invoked at most once.
pub struct Next<'a> {
    inner: &'a (dyn Fn(&Request, &mut Response) -> Outcome + Send + Sync),
}

impl<'a> Next<'a> {
    pub fn new(inner: &'a (dyn Fn(&Request, &mut Response) -> Outcome + Send + Sync)) -> Self {
        Self { inner }
    }

    /// Run every inner link and the action.
    pub fn run(self, req: &Request, res: &mut Response) -> Outcome {
        (self.inner)(req, res)
    }
}

/// Middleware built from a closure. See [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
    name: &'static str,
}

/// Turn a closure into a [`Middleware`].
///
/// ```rust
/// use lenna::middleware::{from_fn, Next};
/// use lenna::{Request, Response};
///
/// let powered_by = from_fn(|req: &Request, res: &mut Response, next: Next<'_>| {
///     let outcome = next.run(req, res);
///     res.set_header("x-powered-by", "lenna");
///     outcome
/// });
/// # let _ = powered_by;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&Request, &mut Response, Next<'_>) -> Outcome + Send + Sync,
{
    FnMiddleware {
        f,
        name: "from_fn",
    }
}

impl<F> FnMiddleware<F> {
    /// Label this middleware in logs.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Request, &mut Response, Next<'_>) -> Outcome + Send + Sync,
{
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        (self.f)(req, res, next)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Registered middleware, shared between every chain that includes it.
#[derive(Clone)]
pub struct MiddlewareEntry {
    middleware: Arc<dyn Middleware>,
}

impl MiddlewareEntry {
    pub fn new<M: Middleware + 'static>(middleware: M) -> Self {
        Self {
            middleware: Arc::new(middleware),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.middleware.name()
    }

    pub fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        self.middleware.call(req, res, next)
    }

    /// Whether both entries wrap the same middleware instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &MiddlewareEntry) -> bool {
        Arc::ptr_eq(&self.middleware, &other.middleware)
    }
}

impl<M: Middleware + 'static> From<M> for MiddlewareEntry {
    fn from(middleware: M) -> Self {
        Self::new(middleware)
    }
}

impl std::fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MiddlewareEntry").field(&self.name()).finish()
    }
}
