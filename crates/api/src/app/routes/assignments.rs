use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use bizdesk_auth::Permission;
use bizdesk_core::{AssignmentId, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/assignments/active", get(active_assignments))
        .route("/assignments/mine", get(my_assignments))
        .route("/assignments/:id/return", post(return_item))
        .route("/users/:user_id/assignments", get(user_assignments))
}

pub async fn active_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }

    match services.inventory().get_active_assignments(ctx.actor()).await {
        Ok(list) => (StatusCode::OK, Json(dto::assignments_to_json(&list))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// What the caller currently holds. Any authenticated member may ask.
pub async fn my_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::AssignmentListQuery>,
) -> axum::response::Response {
    match services
        .inventory()
        .get_user_assignments(ctx.actor(), ctx.user_id(), query.include_returned)
        .await
    {
        Ok(list) => (StatusCode::OK, Json(dto::assignments_to_json(&list))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn user_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(user_id): Path<String>,
    Query(query): Query<dto::AssignmentListQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .get_user_assignments(ctx.actor(), user_id, query.include_returned)
        .await
    {
        Ok(list) => (StatusCode::OK, Json(dto::assignments_to_json(&list))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn return_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReturnItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_ASSIGN) {
        return resp;
    }
    let assignment_id: AssignmentId = match errors::parse_id(&id, "assignment") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .return_item(ctx.actor(), assignment_id, body.item_id, body.return_note)
        .await
    {
        Ok(returned) => (StatusCode::OK, Json(dto::returned_to_json(&returned))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
