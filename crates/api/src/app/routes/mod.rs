use axum::{Router, routing::get};

pub mod assignments;
pub mod inventory;
pub mod members;
pub mod system;

/// Router for all authenticated (company-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/members", get(members::list_members))
        .nest("/inventory", inventory::router().merge(assignments::router()))
}
