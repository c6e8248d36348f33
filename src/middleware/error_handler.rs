//! Converts failures from the inner chain into 500 responses.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::json;
use tracing::error;

use super::core::{Middleware, Next};
use crate::config::{AppConfig, Environment};
use crate::error::{Interrupt, Outcome};
use crate::server::{Request, Response};

/// Longest failure message shown on a development error page.
pub const MAX_DETAIL_CHARS: usize = 500;

const GENERIC_MESSAGE: &str = "Internal Server Error";

/// Catches `Interrupt::Failed` and panics from everything inside it and
/// renders a 500 instead.
///
/// Requests sent as `application/json` get a JSON body, everything else an
/// HTML page. Development and test environments include the (escaped,
/// truncated) failure message; other environments show a generic text.
/// Halts pass through untouched.
///
/// Install it where failures should stop: middleware registered before it
/// sees the rendered 500 as a normal response.
#[derive(Debug, Clone, Copy)]
pub struct ErrorHandler {
    environment: Environment,
}

impl ErrorHandler {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.environment)
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn render(&self, req: &Request, res: &mut Response, message: &str) {
        res.reset();
        res.set_status(500);

        let wants_json = req.content_type().as_deref() == Some("application/json");
        let details = self.environment.shows_error_details();

        if wants_json {
            let body = if details {
                json!({ "data": { "error": message, "status": 500 } })
            } else {
                json!({ "error": GENERIC_MESSAGE, "status": 500 })
            };
            if res.json(&body).is_err() {
                res.text(GENERIC_MESSAGE);
            }
        } else if details {
            res.html(&error_page(&format!(
                r#"<p><strong>Message:</strong> <span id="error-message">{}</span></p>"#,
                escape_html(&truncate(message, MAX_DETAIL_CHARS))
            )));
        } else {
            res.html(&error_page(
                "<p>We're sorry, but something went wrong. \
                 We've been notified about this issue and will take a look at it shortly.</p>",
            ));
        }
    }
}

impl Middleware for ErrorHandler {
    fn call(&self, req: &Request, res: &mut Response, next: Next<'_>) -> Outcome {
        let message = match catch_unwind(AssertUnwindSafe(|| next.run(req, res))) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(Interrupt::Halt(halted))) => return Err(Interrupt::Halt(halted)),
            Ok(Err(Interrupt::Failed(err))) => {
                error!(
                    method = %req.method(),
                    path = %req.path(),
                    error = %err,
                    "Request failed"
                );
                err.to_string()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    method = %req.method(),
                    path = %req.path(),
                    panic_message = %message,
                    "Handler panicked"
                );
                message
            }
        };

        self.render(req, res, &message);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "error_handler"
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// First `max` characters of `s`, with `...` appended when cut.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn error_page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>System Error</title>
  <style>
    body {{ font-family: 'Helvetica Neue', sans-serif; background-color: #F7F7F7; color: #333; margin: 0; padding: 0; }}
    .error-container {{ max-width: 600px; margin: 20px auto; padding: 20px; background: white; border-radius: 4px; }}
    h1 {{ color: #c0392b }}
  </style>
</head>
<body>
  <div class="error-container">
    <h1>Oops! An error has occurred.</h1>
    {body}
  </div>
</body>
</html>
"#
    )
}
