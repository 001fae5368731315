use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query string of `GET /rooms/{room_id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomWindowParams {
    /// First day of the window (`YYYY-MM-DD`, inclusive). Defaults to the
    /// first day of the dataset.
    pub start: Option<String>,
    /// Last day of the window (`YYYY-MM-DD`, inclusive). Defaults to the
    /// last day of the dataset.
    pub end: Option<String>,
}

/// Request body for `PUT /rooms/{room_id}/schedule`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    /// `HH:MM`
    pub on_time: String,
    /// `HH:MM`
    pub off_time: String,
}

/// Request body for `POST /status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddRoomRequest {
    pub room: String,
}
