use chrono::NaiveDate;
use thiserror::Error;

use crate::db::models::PowerState;

/// Domain errors surfaced by the generator, the status store and the query layer.
#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("floor not found: {0}")]
    FloorNotFound(String),

    #[error("no readings for {room} between {start} and {end}")]
    EmptyWindow {
        room: String,
        start: NaiveDate,
        end: NaiveDate,
        /// Device state of the room, which exists even without telemetry.
        status: PowerState,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("generator misconfigured: {0}")]
    Generator(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV storage failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = EnergyError> = std::result::Result<T, E>;
