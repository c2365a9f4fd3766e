/*
 * Responsibility
 * - Method allow-list guard: reject methods outside an explicit list
 * - OPTIONS always passes (the composer owns preflight)
 */
use anyhow::anyhow;
use axum::http::Method;

use crate::error::{ApiError, HttpException};
use crate::handler::{Middleware, MiddlewareFuture, Payload};
use crate::request::RequestCtx;

/// Rejects requests whose method is not in the allow-list.
///
/// A request with no method at all fails with an internal fault, not a 405:
/// that is a malformed or improperly proxied request, a programmer-facing
/// condition rather than a client-facing one.
pub struct AllowMethods {
    allowed: Vec<String>,
}

impl AllowMethods {
    /// The comparison is case-insensitive; the list is stored upper-cased.
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: methods
                .into_iter()
                .map(|m| m.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }
}

impl Middleware for AllowMethods {
    fn call<'a>(&'a self, ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let Some(method) = ctx.method() else {
                return Err(ApiError::Internal(anyhow!("request method is missing")));
            };
            if *method != Method::OPTIONS
                && !self.allowed.iter().any(|m| m.as_str() == method.as_str())
            {
                return Err(HttpException::method_not_allowed().into());
            }
            Ok(Payload::Empty)
        })
    }
}
