use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use bizdesk_auth::Permission;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

/// Members of the caller's company, for assignee pickers.
pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::MEMBERS_READ) {
        return resp;
    }

    match services.inventory().list_members(ctx.actor()).await {
        Ok(members) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": members.len(),
                "members": members.iter().map(dto::member_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
