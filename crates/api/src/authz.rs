//! API-side authorization guard.
//!
//! Permission checks happen at the route boundary, before the inventory
//! manager is called; the manager itself only enforces company scoping.

use axum::http::StatusCode;
use axum::response::Response;

use bizdesk_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::ActorContext;

/// Require `permission` for the current actor, or produce a 403 response.
pub fn require(ctx: &ActorContext, permission: &Permission) -> Result<(), Response> {
    authorize(ctx.actor(), permission).map_err(|e| {
        tracing::warn!(
            user_id = %ctx.user_id(),
            permission = permission.as_str(),
            "permission denied"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
