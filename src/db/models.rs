use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;


/// Schedule assigned to rooms created by the generator or by `add_room`.
pub const DEFAULT_SCHEDULE_ON: &str = "08:00";
pub const DEFAULT_SCHEDULE_OFF: &str = "20:00";

/// Column format of `timestamp` in the readings table.
pub(crate) mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One minute of electrical telemetry for one room.
///
/// `power`, `energy_kwh`, `bill_taka` and `carbon_gco2` are always derived from
/// `voltage * current`; they are stored only to keep the CSV self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub room: String,
    /// Volts
    pub voltage: f64,
    /// Amps, exactly 0 while the device is off
    pub current: f64,
    /// Watts
    pub power: f64,
    pub energy_kwh: f64,
    pub bill_taka: f64,
    pub carbon_gco2: f64,
}

/// On/off state of the device in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn toggled(self) -> Self {
        match self {
            PowerState::On => PowerState::Off,
            PowerState::Off => PowerState::On,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::On => "On",
            PowerState::Off => "Off",
        };
        f.write_str(s)
    }
}

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceStatus {
    pub room: String,
    pub status: PowerState,
    /// `HH:MM`
    pub schedule_on: String,
    /// `HH:MM`
    pub schedule_off: String,
}

impl DeviceStatus {
    /// A newly registered room: switched on, default business-hours schedule.
    pub fn with_defaults(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            status: PowerState::On,
            schedule_on: DEFAULT_SCHEDULE_ON.to_owned(),
            schedule_off: DEFAULT_SCHEDULE_OFF.to_owned(),
        }
    }
}
