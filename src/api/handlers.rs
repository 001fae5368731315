use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use utoipa::OpenApi;

use super::{
    dto::{AddRoomRequest, RoomWindowParams, ScheduleRequest},
    errors::AppError,
    AppState,
};
use crate::{
    config::Floor,
    db::models::{DeviceStatus, PowerState},
    error::{EnergyError, Result},
    query::{
        parse_date, BuildingSummary, FloorView, HourlyPoint, RoomAvgPower, RoomSnapshot,
        RoomView, Savings, Snapshot, Totals,
    },
};

/// Run store/query work on the blocking pool; status calls touch the disk.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

// ---------------------------------------------------------------------------
// Dashboard views
// ---------------------------------------------------------------------------

/// Energy, bill and carbon totals for the whole building, with topology and
/// the current status of every room.
#[utoipa::path(
    get,
    path = "/building",
    responses(
        (status = 200, description = "Building summary", body = BuildingSummary),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dashboard"
)]
pub async fn get_building_summary(
    State(state): State<AppState>,
) -> Result<Json<BuildingSummary>, AppError> {
    let summary = blocking(move || state.query.building_summary()).await?;
    Ok(Json(summary))
}

/// Hourly series, totals, savings estimate and latest activity for one room.
/// The window defaults to the dataset's full date range.
#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        RoomWindowParams,
    ),
    responses(
        (status = 200, description = "Room view", body = RoomView),
        (status = 400, description = "Malformed or inverted date window"),
        (status = 404, description = "Room not in the status table"),
        (status = 422, description = "No readings in the window"),
    ),
    tag = "dashboard"
)]
pub async fn get_room_view(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<RoomWindowParams>,
) -> Result<Json<RoomView>, AppError> {
    let view = blocking(move || {
        let (start, end) = resolve_window(&state, &params)?;
        state.query.room_view(&room_id, start, end)
    })
    .await?;
    Ok(Json(view))
}

/// Explicit bounds win; missing ones come from the dataset's date range.
fn resolve_window(state: &AppState, params: &RoomWindowParams) -> Result<(NaiveDate, NaiveDate)> {
    let default = || {
        state.query.default_window().ok_or_else(|| {
            EnergyError::InvalidInput("dataset is empty; start and end are required".into())
        })
    };
    let start = match &params.start {
        Some(raw) => parse_date(raw)?,
        None => default()?.0,
    };
    let end = match &params.end {
        Some(raw) => parse_date(raw)?,
        None => default()?.1,
    };
    Ok((start, end))
}

/// Totals, per-room mean power and per-room latest snapshot for one floor.
#[utoipa::path(
    get,
    path = "/floors/{floor_name}",
    params(("floor_name" = String, Path, description = "Floor name, e.g. `Ground Floor`")),
    responses(
        (status = 200, description = "Floor view", body = FloorView),
        (status = 404, description = "Unknown floor"),
    ),
    tag = "dashboard"
)]
pub async fn get_floor_view(
    State(state): State<AppState>,
    Path(floor_name): Path<String>,
) -> Result<Json<FloorView>, AppError> {
    let view = blocking(move || state.query.floor_view(&floor_name)).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Device controls
// ---------------------------------------------------------------------------

/// Flip a room's device between On and Off. Returns the whole status table.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/toggle",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Updated status table", body = Vec<DeviceStatus>),
        (status = 404, description = "Room not in the status table"),
    ),
    tag = "controls"
)]
pub async fn toggle_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let rows = blocking(move || state.status.toggle(&room_id)).await?;
    Ok(Json(rows))
}

/// Replace a room's on/off schedule. Returns the whole status table.
#[utoipa::path(
    put,
    path = "/rooms/{room_id}/schedule",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Updated status table", body = Vec<DeviceStatus>),
        (status = 400, description = "Times are not HH:MM"),
        (status = 404, description = "Room not in the status table"),
    ),
    tag = "controls"
)]
pub async fn set_schedule(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let rows =
        blocking(move || state.status.set_schedule(&room_id, &body.on_time, &body.off_time))
            .await?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// The full status table.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Status table", body = Vec<DeviceStatus>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn list_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let rows = blocking(move || state.status.list()).await?;
    Ok(Json(rows))
}

/// Register a room (On, 08:00–20:00). Blank or existing rooms are ignored.
#[utoipa::path(
    post,
    path = "/status",
    request_body = AddRoomRequest,
    responses(
        (status = 200, description = "Updated status table", body = Vec<DeviceStatus>),
    ),
    tag = "admin"
)]
pub async fn add_room(
    State(state): State<AppState>,
    Json(body): Json<AddRoomRequest>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let rows = blocking(move || state.status.add_room(&body.room)).await?;
    Ok(Json(rows))
}

/// Remove a room from the status table. Unknown rooms are ignored.
#[utoipa::path(
    delete,
    path = "/status/{room_id}",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Updated status table", body = Vec<DeviceStatus>),
    ),
    tag = "admin"
)]
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<DeviceStatus>>, AppError> {
    let rows = blocking(move || state.status.delete_room(&room_id)).await?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_building_summary,
        get_room_view,
        get_floor_view,
        toggle_room,
        set_schedule,
        list_status,
        add_room,
        delete_room,
        health,
    ),
    components(schemas(
        BuildingSummary,
        RoomView,
        FloorView,
        Totals,
        Savings,
        Snapshot,
        HourlyPoint,
        RoomAvgPower,
        RoomSnapshot,
        Floor,
        DeviceStatus,
        PowerState,
        ScheduleRequest,
        AddRoomRequest,
    )),
    tags(
        (name = "dashboard", description = "Aggregated consumption views"),
        (name = "controls",  description = "Device on/off and schedule controls"),
        (name = "admin",     description = "Status table administration"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "Building Energy Service API",
        version = "0.1.0",
        description = "Consumption, billing and carbon views over synthetic building telemetry"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
