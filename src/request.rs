/*
 * Responsibility
 * - RequestCtx: the per-request state middlewares read and write
 * - Body collection from the axum request (bounded)
 * - Caller identity slot: written by the auth guard, read by the scope guard
 */
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Uri, header::AsHeaderName};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ValidationError, ValidationIssue};

/// Requests larger than this are rejected before any middleware runs.
const BODY_LIMIT: usize = 1024 * 1024;

/// Per-request context threaded through a composed handler's middlewares.
///
/// The method is optional: a context driven directly by a harness (or built
/// from a malformed upstream request) may carry none, and the guards treat
/// that as a programmer-facing internal fault rather than a client fault.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    method: Option<Method>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    auth: Option<String>,
}

impl RequestCtx {
    /// An empty context with the given method, for harnesses and resolvers.
    pub fn new(method: Method) -> Self {
        Self {
            method: Some(method),
            uri: Uri::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            auth: None,
        }
    }

    /// A context with no method at all (malformed / improperly proxied).
    pub fn without_method() -> Self {
        Self {
            method: None,
            uri: Uri::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            auth: None,
        }
    }

    /// Build from an incoming request, collecting the body up front.
    pub async fn from_request(req: Request<Body>) -> Result<Self, ApiError> {
        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
        Ok(Self {
            method: Some(parts.method),
            uri: parts.uri,
            headers: parts.headers,
            body,
            auth: None,
        })
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value as a str, if present and valid UTF-8.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Deserialize the body as JSON. Failures surface as a validation fault
    /// (400 with an issue list), not an internal one.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ValidationError::new(vec![ValidationIssue {
                path: "body".to_string(),
                message: e.to_string(),
            }])
            .into()
        })
    }

    /// The caller identity attached by the auth guard, if any.
    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn set_auth(&mut self, identity: impl Into<String>) {
        self.auth = Some(identity.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CreateUser {
        name: String,
    }

    #[tokio::test]
    async fn from_request_collects_parts_and_body() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/users?verbose=1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();

        let ctx = RequestCtx::from_request(req).await.unwrap();
        assert_eq!(ctx.method(), Some(&Method::POST));
        assert_eq!(ctx.uri().path(), "/users");
        assert_eq!(ctx.header(header::CONTENT_TYPE), Some("application/json"));
        assert_eq!(
            ctx.json::<CreateUser>().unwrap(),
            CreateUser {
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn malformed_json_is_a_validation_fault() {
        let mut ctx = RequestCtx::new(Method::POST);
        ctx.set_body(&b"{not json"[..]);

        match ctx.json::<CreateUser>() {
            Err(ApiError::Validation(e)) => {
                assert_eq!(e.issues().len(), 1);
                assert_eq!(e.issues()[0].path, "body");
            }
            other => panic!("expected validation fault, got {other:?}"),
        }
    }

    #[test]
    fn auth_slot_round_trips() {
        let mut ctx = RequestCtx::new(Method::GET);
        assert_eq!(ctx.auth(), None);
        ctx.set_auth("user-42");
        assert_eq!(ctx.auth(), Some("user-42"));
    }
}
