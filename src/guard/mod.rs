/*
 * Responsibility
 * - Authorization middlewares and their public interface (re-export)
 * - Guards validate and attach state; they never produce the response body
 */
mod auth;
mod method;
mod scope;

pub use auth::{IdentityResolver, RequireAuth, bearer_token};
pub use method::AllowMethods;
pub use scope::{RequireScope, ScopeMap, ScopeMapError, ScopeResolver};
