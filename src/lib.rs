//! # apikit
//!
//! A small helper layer for building HTTP API route handlers on axum:
//! typed HTTP faults, a middleware composer with uniform CORS and
//! error-mapping behavior, and authorization guards.
//!
//! - [`HttpException`] / [`ApiError`]: one discriminated error type for
//!   everything a handler can fail with; the composer renders each variant
//!   as its fixed JSON wire shape.
//! - [`ApiHandler`]: runs an ordered, non-empty middleware sequence, answers
//!   `OPTIONS` preflight itself, and turns the last middleware's
//!   [`Payload`] into the response.
//! - [`AllowMethods`], [`RequireAuth`], [`RequireScope`]: guards that
//!   validate the request and attach the caller identity; the host supplies
//!   the identity and scope resolvers.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use apikit::{
//!     AllowMethods, ApiHandler, ExecMode, IdentityResolver, Payload, RequestCtx, RequireAuth,
//!     bearer_token, from_fn,
//! };
//! use apikit::handler::MiddlewareFuture;
//! use axum::{Router, routing::any_service};
//!
//! struct TokenResolver;
//!
//! #[async_trait::async_trait]
//! impl IdentityResolver for TokenResolver {
//!     async fn resolve(&self, ctx: &RequestCtx) -> anyhow::Result<String> {
//!         let token = bearer_token(ctx).ok_or_else(|| anyhow::anyhow!("no bearer token"))?;
//!         Ok(token.to_string()) // verify for real here
//!     }
//! }
//!
//! fn list_users<'a>(_ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
//!     Box::pin(async move { Payload::json(&["alice", "bob"]) })
//! }
//!
//! let mode = ExecMode::from_env();
//! let handler = ApiHandler::new(mode, AllowMethods::new(["GET"]))
//!     .then(RequireAuth::new(mode, Arc::new(TokenResolver)))
//!     .then(from_fn(list_users));
//!
//! let app: Router = Router::new().route("/users", any_service(handler));
//! ```

pub mod error;
pub mod guard;
pub mod handler;
pub mod mode;
pub mod request;

pub use error::{ApiError, ExceptionKind, HttpException, ValidationError, ValidationIssue};
pub use guard::{
    AllowMethods, IdentityResolver, RequireAuth, RequireScope, ScopeMap, ScopeMapError,
    ScopeResolver, bearer_token,
};
pub use handler::{ApiHandler, Middleware, Payload, from_fn};
pub use mode::ExecMode;
pub use request::RequestCtx;
