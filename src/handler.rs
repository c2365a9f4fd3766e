/*
 * Responsibility
 * - Middleware trait + fn adapter (type-erased async steps over RequestCtx)
 * - ApiHandler: run middlewares in order, fixed CORS headers, OPTIONS
 *   preflight short-circuit, status/body selection from the last payload,
 *   error rendering (or propagation in test mode)
 * - tower::Service impl so a handler mounts on an axum Router
 */
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tower::Service;

use crate::error::ApiError;
use crate::mode::ExecMode;
use crate::request::RequestCtx;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";
const ALLOW_METHODS: &str = "PUT, POST, PATCH, DELETE, GET";

/// What a middleware resolves with. Only the last middleware's payload
/// drives the response; guards resolve with `Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Payload {
    /// Serialize any value into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        let v = serde_json::to_value(value).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
        Ok(Self::Json(v))
    }

    fn is_truthy(&self) -> bool {
        match self {
            Payload::Empty => false,
            Payload::Text(s) => !s.is_empty(),
            Payload::Json(v) => !v.is_null(),
        }
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

pub type MiddlewareFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Payload, ApiError>> + Send + 'a>>;

/// One async step in a composed handler. Steps run strictly in order; a
/// failing step short-circuits the rest.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a>;
}

/// Adapts a plain async fn to [`Middleware`]. See [`from_fn`].
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestCtx) -> MiddlewareFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        (self.0)(ctx)
    }
}

/// Wrap a function as a middleware:
///
/// ```ignore
/// fn list_users<'a>(ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
///     Box::pin(async move { Payload::json(&["alice", "bob"]) })
/// }
///
/// let handler = ApiHandler::new(mode, AllowMethods::new(["GET"])).then(from_fn(list_users));
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestCtx) -> MiddlewareFuture<'a> + Send + Sync + 'static,
{
    FnMiddleware(f)
}

/// An ordered, non-empty middleware sequence composed into one
/// request/response cycle with uniform CORS and error-mapping behavior.
#[derive(Clone)]
pub struct ApiHandler {
    mode: ExecMode,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ApiHandler {
    /// The first middleware is required up front, so a handler can never be
    /// composed empty.
    pub fn new(mode: ExecMode, first: impl Middleware) -> Self {
        Self {
            mode,
            middlewares: vec![Arc::new(first)],
        }
    }

    /// Append a middleware. Only the last one's payload becomes the body;
    /// earlier ones validate and attach state.
    pub fn then(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Run one request/response cycle.
    ///
    /// In normal mode every error is rendered and this always returns `Ok`
    /// with exactly one response. In test mode errors come back as `Err` so a
    /// harness can assert on the fault itself.
    pub async fn handle(&self, req: Request<Body>) -> Result<Response, ApiError> {
        if req.method() == Method::OPTIONS {
            return Ok(preflight_response());
        }

        let method = req.method().clone();
        match self.run(req, &method).await {
            Ok(resp) => Ok(with_cors(resp)),
            Err(err) if self.mode.is_test() => Err(err),
            Err(err) => Ok(with_cors(err.into_response())),
        }
    }

    async fn run(&self, req: Request<Body>, method: &Method) -> Result<Response, ApiError> {
        let mut ctx = RequestCtx::from_request(req).await?;
        let mut last = Payload::Empty;
        for middleware in &self.middlewares {
            last = middleware.call(&mut ctx).await?;
        }
        Ok(render(method, last))
    }
}

/// Status/body selection for the final middleware's payload.
fn render(method: &Method, payload: Payload) -> Response {
    let status = if *method == Method::POST {
        StatusCode::CREATED
    } else if payload.is_truthy() {
        StatusCode::OK
    } else {
        StatusCode::NO_CONTENT
    };

    match payload {
        Payload::Json(v) if !v.is_null() => (status, Json(v)).into_response(),
        Payload::Text(s) if !s.is_empty() => (status, s).into_response(),
        _ => status.into_response(),
    }
}

fn with_cors(mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    resp
}

fn preflight_response() -> Response {
    let mut resp = with_cors(StatusCode::OK.into_response());
    resp.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    resp
}

/// Mount a handler on a router with `axum::routing::any_service`. A mounted
/// handler always renders, even in test mode — the test-mode error path only
/// makes sense when a harness drives [`ApiHandler::handle`] directly.
impl Service<Request<Body>> for ApiHandler {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            let resp = match handler.handle(req).await {
                Ok(resp) => resp,
                Err(err) => with_cors(err.into_response()),
            };
            Ok(resp)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpException;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records whether it ran, then resolves with a fixed payload.
    struct Probe {
        ran: Arc<AtomicBool>,
        payload: Payload,
    }

    impl Probe {
        fn new(ran: Arc<AtomicBool>, payload: Payload) -> Self {
            Self { ran, payload }
        }
    }

    impl Middleware for Probe {
        fn call<'a>(&'a self, _ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
            self.ran.store(true, Ordering::SeqCst);
            let payload = self.payload.clone();
            Box::pin(async move { Ok(payload) })
        }
    }

    fn fail_not_found<'a>(_ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        Box::pin(async { Err(HttpException::not_found().into()) })
    }

    fn ok_empty<'a>(_ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        Box::pin(async { Ok(Payload::Empty) })
    }

    fn request(method: Method) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/things")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_bytes(resp: Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn preflight_short_circuits_middleware() {
        let ran = Arc::new(AtomicBool::new(false));
        let handler = ApiHandler::new(
            ExecMode::Normal,
            Probe::new(ran.clone(), Payload::from("never")),
        );

        let resp = handler.handle(request(Method::OPTIONS)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!ran.load(Ordering::SeqCst));

        let headers = resp.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Origin, X-Requested-With, Content-Type, Accept, Authorization"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "PUT, POST, PATCH, DELETE, GET"
        );
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn post_is_201_regardless_of_payload() {
        let handler = ApiHandler::new(ExecMode::Normal, from_fn(ok_empty));
        let resp = handler.handle(request(Method::POST)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn get_with_empty_payload_is_204() {
        let handler = ApiHandler::new(ExecMode::Normal, from_fn(ok_empty));
        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn get_with_text_payload_is_200_raw() {
        let ran = Arc::new(AtomicBool::new(false));
        let handler = ApiHandler::new(ExecMode::Normal, Probe::new(ran, Payload::from("pong")));
        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"pong");
    }

    #[tokio::test]
    async fn get_with_json_payload_is_200_encoded() {
        let ran = Arc::new(AtomicBool::new(false));
        let handler = ApiHandler::new(
            ExecMode::Normal,
            Probe::new(ran, Payload::Json(json!({"id": 7}))),
        );
        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body, json!({"id": 7}));
    }

    #[tokio::test]
    async fn only_the_last_payload_drives_the_response() {
        let first = Arc::new(AtomicBool::new(false));
        let handler = ApiHandler::new(
            ExecMode::Normal,
            Probe::new(first.clone(), Payload::from("discarded")),
        )
        .then(from_fn(ok_empty));

        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert!(first.load(Ordering::SeqCst));
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn a_failing_step_stops_the_chain() {
        let second = Arc::new(AtomicBool::new(false));
        let handler = ApiHandler::new(ExecMode::Normal, from_fn(fail_not_found))
            .then(Probe::new(second.clone(), Payload::from("never")));

        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert!(!second.load(Ordering::SeqCst));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn errors_keep_the_cors_headers() {
        let handler = ApiHandler::new(ExecMode::Normal, from_fn(fail_not_found));
        let resp = handler.handle(request(Method::GET)).await.unwrap();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_mode_propagates_the_fault() {
        let handler = ApiHandler::new(ExecMode::Test, from_fn(fail_not_found));
        match handler.handle(request(Method::GET)).await {
            Err(ApiError::Http(e)) => assert_eq!(e.status(), StatusCode::NOT_FOUND),
            other => panic!("expected propagated fault, got {other:?}"),
        }
    }
}
