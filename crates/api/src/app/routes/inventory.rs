use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use bizdesk_auth::Permission;
use bizdesk_core::ItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/assign", post(assign_item))
        .route("/items/:id/assignments", get(item_history))
        .route("/items/:id/assignments/active", get(item_active_assignments))
        .route("/summary", get(summary))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let (new_item, assignees, note) = body.into_parts();
    // Handing out on creation needs the assign permission as well.
    if !assignees.is_empty() {
        if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_ASSIGN) {
            return resp;
        }
    }

    match services
        .inventory()
        .create_item_with_assignments(ctx.actor(), new_item, &assignees, note)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(dto::created_to_json(&created))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ItemListQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.inventory().get_inventory_items(ctx.actor(), filter).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": items.len(),
                "items": items.iter().map(dto::item_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().get_inventory_item_by_id(ctx.actor(), item_id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .update_inventory_item(ctx.actor(), item_id, body.into())
        .await
    {
        Ok(item) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().delete_inventory_item(ctx.actor(), item_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn assign_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_ASSIGN) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .assign_item(ctx.actor(), item_id, body.user_id, body.note)
        .await
    {
        Ok(assignment) => (
            StatusCode::CREATED,
            Json(dto::assignment_to_json(&assignment)),
        )
            .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn item_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .get_item_assignment_history(ctx.actor(), item_id)
        .await
    {
        Ok(list) => (StatusCode::OK, Json(dto::assignments_to_json(&list))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn item_active_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }
    let item_id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .inventory()
        .get_active_assignments_for_item(ctx.actor(), item_id)
        .await
    {
        Ok(list) => (StatusCode::OK, Json(dto::assignments_to_json(&list))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&ctx, &Permission::INVENTORY_READ) {
        return resp;
    }

    match services.inventory().inventory_summary(ctx.actor()).await {
        Ok(s) => (StatusCode::OK, Json(dto::summary_to_json(&s))).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
