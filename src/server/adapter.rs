//! Conversions between this crate's request/response types and the `http`
//! crate's, so any `http`-based server can drive an
//! [`Application`](crate::app::Application).

use crate::error::RouterError;
use crate::method::Method;

use super::request::Request;
use super::response::FinishedResponse;

impl Request {
    /// Build a [`Request`] from an `http` request with a buffered body.
    ///
    /// Fails with [`RouterError::UnsupportedMethod`] for verbs outside the
    /// supported set. Header values that are not valid UTF-8 are decoded
    /// lossily.
    pub fn from_http(req: http::Request<Vec<u8>>) -> Result<Self, RouterError> {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());

        let mut request = Request::new(method, target).with_body(body);
        for (name, value) in &parts.headers {
            request.push_header(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        Ok(request)
    }
}

impl FinishedResponse {
    /// Convert into an `http` response.
    ///
    /// Fails only when a status or header cannot be represented, which
    /// handlers can cause by setting e.g. a status of 1000.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        builder.body(self.body.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Response;

    #[test]
    fn test_from_http_request() {
        let req = http::Request::builder()
            .method("POST")
            .uri("http://example.com/users/1?verbose=true")
            .header("Content-Type", "application/json")
            .header("x-multi", "a")
            .header("x-multi", "b")
            .body(br#"{"name":"Ann"}"#.to_vec())
            .unwrap();

        let req = Request::from_http(req).unwrap();
        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.path(), "/users/1");
        assert_eq!(req.query_string(), Some("verbose=true"));
        assert_eq!(req.content_type().as_deref(), Some("application/json"));
        assert_eq!(req.header("x-multi"), Some("a"));
        assert_eq!(req.param_str("name"), Some("Ann"));
        assert_eq!(req.param_str("verbose"), Some("true"));
    }

    #[test]
    fn test_from_http_rejects_unsupported_method() {
        let req = http::Request::builder()
            .method("TRACE")
            .uri("/")
            .body(Vec::new())
            .unwrap();
        assert!(matches!(
            Request::from_http(req),
            Err(RouterError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_into_http_response() {
        let mut res = Response::with_status(201);
        res.set_header("x-id", "7");
        res.write("created");
        let http_res = res.finish().into_http().unwrap();

        assert_eq!(http_res.status(), http::StatusCode::CREATED);
        assert_eq!(http_res.headers()["x-id"], "7");
        assert_eq!(http_res.headers()["content-length"], "7");
        assert_eq!(http_res.body(), b"created");
    }

    #[test]
    fn test_into_http_rejects_bad_status() {
        let res = Response::with_status(1000).finish();
        assert!(res.into_http().is_err());
    }
}
