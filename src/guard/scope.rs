/*
 * Responsibility
 * - Scope guard: require a scope per request method and check it against the
 *   caller's granted set
 * - ScopeMap: method → required-scope mapping, validated at construction
 */
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::http::Method;
use thiserror::Error;

use crate::error::{ApiError, HttpException};
use crate::handler::{Middleware, MiddlewareFuture, Payload};
use crate::mode::ExecMode;
use crate::request::RequestCtx;

/// Looks up the scopes granted to a caller identity. Supplied by the host
/// application (database, token claims, ...).
#[async_trait]
pub trait ScopeResolver: Send + Sync + 'static {
    async fn scopes_for(&self, identity: &str) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeMapError {
    #[error("scope map has no rules")]
    Empty,
    #[error("scope value is empty")]
    EmptyScope,
}

/// Which scope a request method requires.
///
/// Misconfiguration (no rules, empty scope values) is rejected here, at
/// construction, instead of failing on the first request that hits the
/// broken slot.
#[derive(Debug, Clone)]
pub struct ScopeMap {
    rule: Rule,
}

#[derive(Debug, Clone)]
enum Rule {
    Any(String),
    PerMethod(Vec<(Method, String)>),
}

impl ScopeMap {
    /// One scope required for every method.
    pub fn any(scope: impl Into<String>) -> Result<Self, ScopeMapError> {
        let scope = scope.into();
        if scope.is_empty() {
            return Err(ScopeMapError::EmptyScope);
        }
        Ok(Self {
            rule: Rule::Any(scope),
        })
    }

    /// Ordered `(method, scope)` pairs; the first matching method wins.
    /// A method with no entry requires no scope at all.
    pub fn per_method<I, S>(pairs: I) -> Result<Self, ScopeMapError>
    where
        I: IntoIterator<Item = (Method, S)>,
        S: Into<String>,
    {
        let pairs: Vec<(Method, String)> =
            pairs.into_iter().map(|(m, s)| (m, s.into())).collect();
        if pairs.is_empty() {
            return Err(ScopeMapError::Empty);
        }
        if pairs.iter().any(|(_, s)| s.is_empty()) {
            return Err(ScopeMapError::EmptyScope);
        }
        Ok(Self {
            rule: Rule::PerMethod(pairs),
        })
    }

    pub fn required_for(&self, method: &Method) -> Option<&str> {
        match &self.rule {
            Rule::Any(scope) => Some(scope),
            Rule::PerMethod(pairs) => pairs
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, s)| s.as_str()),
        }
    }
}

/// Enforces the scope required for the current method against the caller's
/// granted scopes. Reads the identity attached by [`RequireAuth`]; in test
/// mode this is a no-op.
pub struct RequireScope {
    mode: ExecMode,
    resolver: Arc<dyn ScopeResolver>,
    map: ScopeMap,
}

impl RequireScope {
    pub fn new(mode: ExecMode, resolver: Arc<dyn ScopeResolver>, map: ScopeMap) -> Self {
        Self {
            mode,
            resolver,
            map,
        }
    }
}

impl Middleware for RequireScope {
    fn call<'a>(&'a self, ctx: &'a mut RequestCtx) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            if self.mode.is_test() {
                return Ok(Payload::Empty);
            }
            let Some(method) = ctx.method().cloned() else {
                return Err(ApiError::Internal(anyhow!("request method is missing")));
            };
            let Some(required) = self.map.required_for(&method) else {
                // no entry for this method: no scope required
                return Ok(Payload::Empty);
            };
            let Some(identity) = ctx.auth() else {
                // no identity attached: the auth guard did not run before us
                return Err(HttpException::unauthorized().into());
            };
            let scopes = self
                .resolver
                .scopes_for(identity)
                .await
                .map_err(ApiError::Internal)?;
            if !scopes.iter().any(|s| s == required) {
                return Err(HttpException::forbidden().into());
            }
            Ok(Payload::Empty)
        })
    }
}
