use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::EnergyError;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<EnergyError>() {
            Some(EnergyError::RoomNotFound(_) | EnergyError::FloorNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Some(EnergyError::EmptyWindow { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(EnergyError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let message = self.0.to_string();
        let body = match self.0.downcast_ref::<EnergyError>() {
            Some(EnergyError::EmptyWindow { room, status: state, .. }) => {
                json!({ "error": message, "room": room, "status": state })
            }
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
