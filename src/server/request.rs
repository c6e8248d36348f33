use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::debug;

use crate::method::Method;
use crate::router::ParamVec;

/// Maximum number of headers stored inline before spilling to the heap.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage: lowercase names in arrival order.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

const JSON_MIME: &str = "application/json";
const FORM_MIME: &str = "application/x-www-form-urlencoded";

/// Merged request parameters.
///
/// Sources are applied lowest precedence first: query string, then body,
/// then path captures. A later source replaces an earlier value under the
/// same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value under `key`; `None` for missing keys and non-string values.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Inbound request handed to middleware and handlers.
///
/// Built once by the host adapter (or directly in tests). Everything but the
/// path captures is fixed at construction; captures are attached by the
/// application after routing and before the chain runs.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderVec,
    body: Vec<u8>,
    path_params: ParamVec,
    params: OnceCell<Params>,
}

impl Request {
    /// Build a request from a method and a request target.
    ///
    /// Anything after the first `?` in `target` becomes the query string.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: HeaderVec::new(),
            body: Vec::new(),
            path_params: ParamVec::new(),
            params: OnceCell::new(),
        }
    }

    /// Append a header. The name is stored lowercase.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_header(name, value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.params = OnceCell::new();
        self
    }

    pub(crate) fn push_header(&mut self, name: &str, value: String) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value));
    }

    /// Attach route captures. Any params computed earlier are discarded.
    pub(crate) fn set_path_params(&mut self, params: ParamVec) {
        self.path_params = params;
        self.params = OnceCell::new();
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// First value for the header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type of the body without parameters (`application/json; charset=utf-8`
    /// yields `application/json`), lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Deserialize the body as JSON regardless of the declared content type.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Cookies from the `cookie` header.
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        self.header("cookie")
            .map(|c| {
                c.split(';')
                    .filter_map(|pair| {
                        let mut parts = pair.trim().splitn(2, '=');
                        let name = parts.next()?.trim();
                        if name.is_empty() {
                            return None;
                        }
                        let value = parts.next().unwrap_or("").trim();
                        Some((name.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }

    /// Route capture `name`; the deepest one wins when a name repeats.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query, body and path parameters merged. Parsed on first access.
    pub fn params(&self) -> &Params {
        self.params.get_or_init(|| self.parse_params())
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params().get(key)
    }

    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params().get_str(key)
    }

    fn parse_params(&self) -> Params {
        let mut merged = Map::new();

        if let Some(query) = self.query.as_deref() {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                merged.insert(k.into_owned(), Value::String(v.into_owned()));
            }
        }

        match self.content_type().as_deref() {
            Some(JSON_MIME) if !self.body.is_empty() => {
                match serde_json::from_slice::<Value>(&self.body) {
                    Ok(Value::Object(fields)) => merged.extend(fields),
                    Ok(_) => debug!(path = %self.path, "JSON body is not an object, ignored"),
                    Err(e) => debug!(path = %self.path, error = %e, "Invalid JSON body, ignored"),
                }
            }
            Some(FORM_MIME) => {
                for (k, v) in url::form_urlencoded::parse(&self.body) {
                    merged.insert(k.into_owned(), Value::String(v.into_owned()));
                }
            }
            _ => {}
        }

        for (k, v) in &self.path_params {
            merged.insert(k.to_string(), Value::String(v.clone()));
        }

        Params(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_split() {
        let req = Request::new(Method::Get, "/search?q=rust&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), Some("q=rust&page=2"));
        assert_eq!(req.param_str("q"), Some("rust"));
        assert_eq!(req.param_str("page"), Some("2"));
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let req = Request::new(Method::Get, "/").with_header("X-Trace", "abc");
        assert_eq!(req.headers()[0].0.as_ref(), "x-trace");
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.header("X-TRACE"), Some("abc"));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let req = Request::new(Method::Post, "/")
            .with_header("Content-Type", "Application/JSON; charset=utf-8");
        assert_eq!(req.content_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn test_cookies() {
        let req = Request::new(Method::Get, "/").with_header("cookie", "a=1; b = two ; flag");
        let cookies = req.cookies();
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("two"));
        assert_eq!(cookies.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_json_body_params() {
        let req = Request::new(Method::Post, "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Ann","age":30}"#);
        assert_eq!(req.param_str("name"), Some("Ann"));
        assert_eq!(req.param("age"), Some(&Value::from(30)));
    }

    #[test]
    fn test_form_body_params() {
        let req = Request::new(Method::Post, "/")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("name=Ann+Lee&city=S%C3%A3o+Paulo");
        assert_eq!(req.param_str("name"), Some("Ann Lee"));
        assert_eq!(req.param_str("city"), Some("São Paulo"));
    }

    #[test]
    fn test_unparseable_or_unknown_bodies_yield_no_params() {
        let bad = Request::new(Method::Post, "/")
            .with_header("content-type", "application/json")
            .with_body("{not json");
        assert!(bad.params().is_empty());

        let array = Request::new(Method::Post, "/")
            .with_header("content-type", "application/json")
            .with_body("[1,2]");
        assert!(array.params().is_empty());

        let plain = Request::new(Method::Post, "/")
            .with_header("content-type", "text/plain")
            .with_body("name=Ann");
        assert!(plain.params().is_empty());
    }

    #[test]
    fn test_precedence_query_then_body_then_path() {
        let mut req = Request::new(Method::Post, "/users/7?id=query&source=query&page=1")
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"body","source":"body"}"#);
        req.set_path_params(ParamVec::from_iter([(Arc::from("id"), "7".to_string())]));

        assert_eq!(req.param_str("id"), Some("7"));
        assert_eq!(req.param_str("source"), Some("body"));
        assert_eq!(req.param_str("page"), Some("1"));
        assert_eq!(req.path_param("id"), Some("7"));
    }

    #[test]
    fn test_params_recomputed_after_captures_attached() {
        let mut req = Request::new(Method::Get, "/users/7");
        assert!(req.param("id").is_none());
        req.set_path_params(ParamVec::from_iter([(Arc::from("id"), "7".to_string())]));
        assert_eq!(req.param_str("id"), Some("7"));
    }
}
