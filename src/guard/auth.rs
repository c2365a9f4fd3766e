/*
 * Responsibility
 * - Identity guard: resolve the caller via an injected resolver and attach
 *   the identity to the request context for downstream guards
 * - Any resolver failure is normalized to 401; the cause is logged, never
 *   surfaced to the caller
 */
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header;

use crate::error::HttpException;
use crate::handler::{Middleware, MiddlewareFuture, Payload};
use crate::mode::ExecMode;
use crate::request::RequestCtx;

/// Resolves a caller identity from the request. Supplied by the host
/// application; typically verifies a token from the Authorization header.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn resolve(&self, ctx: &RequestCtx) -> anyhow::Result<String>;
}

/// Extract the `Authorization: Bearer` token, for resolver implementations.
pub fn bearer_token(ctx: &RequestCtx) -> Option<&str> {
    ctx.header(header::AUTHORIZATION)
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Attaches the resolved caller identity to the context. In test mode this
/// is a no-op so harnesses can bypass real credential resolution.
pub struct RequireAuth {
    mode: ExecMode,
    resolver: Arc<dyn IdentityResolver>,
}

impl RequireAuth {
    pub fn new(mode: ExecMode, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { mode, resolver }
    }
}

impl Middleware for RequireAuth {
    fn call<'a>(&'a self, ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            if self.mode.is_test() {
                return Ok(Payload::Empty);
            }
            match self.resolver.resolve(ctx).await {
                Ok(identity) => {
                    ctx.set_auth(identity);
                    Ok(Payload::Empty)
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "identity resolution failed");
                    Err(HttpException::unauthorized().into())
                }
            }
        })
    }
}
