use std::sync::Arc;

use serde::Serialize;

use super::request::HeaderVec;

pub(crate) const CONTENT_TYPE: &str = "content-type";
pub(crate) const CONTENT_LENGTH: &str = "content-length";
const LOCATION: &str = "location";
const SET_COOKIE: &str = "set-cookie";
const EXPIRED_COOKIE: &str = "max-age=0; expires=Thu, 01 Jan 1970 00:00:00 GMT";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Reason phrase for the status codes this crate produces itself.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Outgoing response being accumulated by middleware and handlers.
///
/// Status defaults to 200. Header names are stored lowercase. The body is
/// an ordered list of chunks; [`finish`](Self::finish) turns the whole thing
/// into an immutable [`FinishedResponse`].
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    body: Vec<Vec<u8>>,
    length: usize,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::with_status(200)
    }

    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Vec::new(),
            length: 0,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, appending to an existing value with `", "`.
    ///
    /// `set-cookie` values cannot be comma-joined, so each one gets its own
    /// entry instead.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case(SET_COOKIE) {
            self.append_header(name, value);
            return;
        }
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self
                .headers
                .push((Arc::from(name.to_ascii_lowercase()), value.to_string())),
        }
    }

    /// Set a header, discarding any existing value.
    pub fn replace_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.clear();
                existing.push_str(value);
            }
            None => self
                .headers
                .push((Arc::from(name.to_ascii_lowercase()), value.to_string())),
        }
    }

    /// Add a separate header entry, even if `name` is already present.
    pub fn append_header(&mut self, name: &str, value: &str) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.to_string()));
    }

    /// Add a `set-cookie` entry. Name and value are form-encoded.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        let cookie = format!("{}={}", encode_cookie_part(name), encode_cookie_part(value));
        self.append_header(SET_COOKIE, &cookie);
    }

    /// Drop any cookie set earlier under `name` and tell the client to
    /// expire it.
    pub fn delete_cookie(&mut self, name: &str) {
        let prefix = format!("{}=", encode_cookie_part(name));
        self.headers
            .retain(|(k, v)| !(k.as_ref() == SET_COOKIE && v.starts_with(&prefix)));
        self.append_header(SET_COOKIE, &format!("{prefix}; {EXPIRED_COOKIE}"));
    }

    /// `set-cookie` values in the order they were added.
    pub fn cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.as_ref() == SET_COOKIE)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let pos = self
            .headers
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.headers.remove(pos).1)
    }

    /// Append a body chunk and update `content-length`.
    pub fn write(&mut self, chunk: impl Into<Vec<u8>>) {
        let chunk = chunk.into();
        self.length += chunk.len();
        self.body.push(chunk);
        let length = self.length.to_string();
        self.replace_header(CONTENT_LENGTH, &length);
    }

    /// Body length in bytes.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn body_chunks(&self) -> &[Vec<u8>] {
        &self.body
    }

    /// Write `body` as `text/plain`.
    pub fn text(&mut self, body: &str) {
        self.replace_header(CONTENT_TYPE, TEXT_PLAIN);
        self.write(body);
    }

    /// Write `body` as `text/html`.
    pub fn html(&mut self, body: &str) {
        self.replace_header(CONTENT_TYPE, TEXT_HTML);
        self.write(body);
    }

    /// Serialize `value` and write it as `application/json`.
    ///
    /// Nothing is modified when serialization fails.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.replace_header(CONTENT_TYPE, APPLICATION_JSON);
        self.write(bytes);
        Ok(())
    }

    /// Point `location` at `target` with the given status.
    pub fn redirect(&mut self, target: &str, status: u16) {
        self.replace_header(LOCATION, target);
        self.status = status;
    }

    /// [`redirect`](Self::redirect) with 302 Found.
    pub fn redirect_found(&mut self, target: &str) {
        self.redirect(target, 302);
    }

    /// Replace everything with the plain-text 404 response.
    pub fn not_found(&mut self) {
        self.reset();
        self.status = 404;
        self.text(status_reason(404));
    }

    /// Back to an empty 200.
    pub fn reset(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.body.clear();
        self.length = 0;
    }

    /// Freeze into the `(status, headers, body)` triple.
    ///
    /// `content-type` defaults to `text/plain; charset=utf-8` when unset and
    /// `content-length` is recomputed from the body.
    #[must_use]
    pub fn finish(mut self) -> FinishedResponse {
        if self.header(CONTENT_TYPE).is_none() {
            self.replace_header(CONTENT_TYPE, TEXT_PLAIN);
        }
        let length = self.body.iter().map(Vec::len).sum::<usize>();
        self.replace_header(CONTENT_LENGTH, &length.to_string());

        FinishedResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Final response triple handed back to the host server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<Vec<u8>>,
}

impl FinishedResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body chunks joined.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.concat()
    }

    /// Body as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes()).into_owned()
    }
}

fn encode_cookie_part(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
