#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use lenna::middleware::{from_fn, MiddlewareEntry, Next};
use lenna::{Application, FinishedResponse, Method, Request, Response};

/// Shared list of markers appended by test middleware and actions.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// Middleware recording `<label>-before` and `<label>-after` around `next`.
pub fn marker(trace: &Trace, label: &'static str) -> MiddlewareEntry {
    let trace = Arc::clone(trace);
    from_fn(move |req: &Request, res: &mut Response, next: Next<'_>| {
        trace.lock().unwrap().push(format!("{label}-before"));
        let outcome = next.run(req, res);
        trace.lock().unwrap().push(format!("{label}-after"));
        outcome
    })
    .named(label)
    .into()
}

/// Middleware that records `<label>` and answers 403 without calling `next`.
pub fn blocker(trace: &Trace, label: &'static str) -> MiddlewareEntry {
    let trace = Arc::clone(trace);
    from_fn(move |_req: &Request, res: &mut Response, _next: Next<'_>| {
        trace.lock().unwrap().push(label.to_string());
        res.set_status(403);
        res.text("blocked");
        Ok(())
    })
    .into()
}

pub fn get(app: &Application, target: &str) -> FinishedResponse {
    app.call(Request::new(Method::Get, target)).unwrap()
}
