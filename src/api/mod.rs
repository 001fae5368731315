pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{query::QueryService, status::StatusService};

use handlers::ApiDoc;

/// Shared by every handler; both services are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub status: StatusService,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/building", get(handlers::get_building_summary))
        .route("/rooms/{room_id}", get(handlers::get_room_view))
        .route("/rooms/{room_id}/toggle", post(handlers::toggle_room))
        .route("/rooms/{room_id}/schedule", put(handlers::set_schedule))
        .route("/floors/{floor_name}", get(handlers::get_floor_view))
        .route("/status", get(handlers::list_status).post(handlers::add_room))
        .route("/status/{room_id}", delete(handlers::delete_room))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
