//! Before/after hooks.
//!
//! Hooks run outside the middleware chain, in this order:
//!
//! 1. `before("*")` hooks
//! 2. `before(pattern)` hooks whose pattern matches the request path
//! 3. the chain (middleware and action, or not-found)
//! 4. matching `after(pattern)` hooks
//! 5. `after("*")` hooks
//!
//! Each group runs in registration order. The first `Err` stops the rest,
//! so a halt from a before hook skips the route and every after hook.

use crate::error::Outcome;
use crate::middleware::Handler;
use crate::router::split_path;
use crate::server::{Request, Response};

/// Hook pattern matching every path.
pub const ALL_PATHS: &str = "*";

struct Hook {
    /// Normalized path pattern, `None` for [`ALL_PATHS`]
    pattern: Option<String>,
    action: Handler,
}

#[derive(Default)]
pub(super) struct Hooks {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl Hooks {
    pub(super) fn add_before(&mut self, pattern: Option<String>, action: Handler) {
        self.before.push(Hook { pattern, action });
    }

    pub(super) fn add_after(&mut self, pattern: Option<String>, action: Handler) {
        self.after.push(Hook { pattern, action });
    }

    pub(super) fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub(super) fn run(&self, req: &Request, res: &mut Response, chain: &Handler) -> Outcome {
        if self.before.is_empty() && self.after.is_empty() {
            return chain(req, res);
        }

        let path = req.path();
        let global = |hook: &&Hook| hook.pattern.is_none();
        let scoped = |hook: &&Hook| {
            hook.pattern
                .as_deref()
                .is_some_and(|pattern| path_matches(pattern, path))
        };

        for hook in self.before.iter().filter(global) {
            (hook.action)(req, res)?;
        }
        for hook in self.before.iter().filter(scoped) {
            (hook.action)(req, res)?;
        }

        chain(req, res)?;

        for hook in self.after.iter().filter(scoped) {
            (hook.action)(req, res)?;
        }
        for hook in self.after.iter().filter(global) {
            (hook.action)(req, res)?;
        }
        Ok(())
    }
}

/// Whether `path` matches a hook `pattern`, segment by segment.
///
/// `:name` segments match any single segment. Slashes are normalized the
/// same way route paths are.
#[must_use]
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern = split_path(pattern);
    let path = split_path(path);
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| p.starts_with(':') || p == s)
}
