pub mod service;

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::{Floor, Tariff},
    db::models::{PowerState, Reading},
    error::{EnergyError, Result},
};

pub use self::service::QueryService;

/// Current above which a device counts as actually drawing power.
pub const ACTIVITY_THRESHOLD_AMPS: f64 = 0.5;

/// Share of consumption the savings estimate assumes could be avoided.
pub const SAVINGS_RATIO: f64 = 0.20;

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct Totals {
    pub energy_kwh: f64,
    pub bill_taka: f64,
    pub carbon_gco2: f64,
}

impl Totals {
    pub fn of<'a>(readings: impl IntoIterator<Item = &'a Reading>) -> Self {
        readings.into_iter().fold(Self::default(), |acc, r| Self {
            energy_kwh: acc.energy_kwh + r.energy_kwh,
            bill_taka: acc.bill_taka + r.bill_taka,
            carbon_gco2: acc.carbon_gco2 + r.carbon_gco2,
        })
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            energy_kwh: self.energy_kwh + other.energy_kwh,
            bill_taka: self.bill_taka + other.bill_taka,
            carbon_gco2: self.carbon_gco2 + other.carbon_gco2,
        }
    }
}

/// What-if estimate: a fixed share of the window's energy, priced at the tariff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Savings {
    pub energy_kwh: f64,
    pub bill_taka: f64,
}

impl Savings {
    pub fn estimate(totals: &Totals, tariff: &Tariff) -> Self {
        let energy_kwh = totals.energy_kwh * SAVINGS_RATIO;
        Self {
            energy_kwh,
            bill_taka: energy_kwh * tariff.rate_per_kwh,
        }
    }
}

/// Electrical state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

impl From<&Reading> for Snapshot {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp,
            voltage: r.voltage,
            current: r.current,
            power: r.power,
        }
    }
}

/// Hour-bucket means; `hour` is the bucket's wall-clock start.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HourlyPoint {
    pub hour: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub samples: usize,
}

/// Last reading above the activity threshold; otherwise the last reading.
/// `readings` must be in timestamp order.
pub fn latest_activity(readings: &[Reading]) -> Option<&Reading> {
    readings
        .iter()
        .rev()
        .find(|r| r.current > ACTIVITY_THRESHOLD_AMPS)
        .or_else(|| readings.last())
}

/// Parse a `YYYY-MM-DD` window bound.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| EnergyError::InvalidInput(format!("date must be YYYY-MM-DD, got {raw:?}")))
}

fn hour_start(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(ts.hour()))
}

/// Mean voltage, current and power per wall-clock hour. Hours without
/// readings produce no point. `readings` must be in timestamp order.
pub fn hourly_series(readings: &[Reading]) -> Vec<HourlyPoint> {
    let mut series: Vec<HourlyPoint> = Vec::new();

    for r in readings {
        let hour = hour_start(r.timestamp);
        match series.last_mut() {
            Some(point) if point.hour == hour => {
                point.voltage += r.voltage;
                point.current += r.current;
                point.power += r.power;
                point.samples += 1;
            }
            _ => series.push(HourlyPoint {
                hour,
                voltage: r.voltage,
                current: r.current,
                power: r.power,
                samples: 1,
            }),
        }
    }

    for point in &mut series {
        let n = point.samples as f64;
        point.voltage /= n;
        point.current /= n;
        point.power /= n;
    }
    series
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuildingSummary {
    pub totals: Totals,
    pub floors: Vec<Floor>,
    /// Room → current device state, for every row of the status table.
    pub status: BTreeMap<String, PowerState>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomView {
    pub room: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub series: Vec<HourlyPoint>,
    pub totals: Totals,
    pub savings: Savings,
    pub latest: Snapshot,
    pub status: PowerState,
    pub schedule_on: String,
    pub schedule_off: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomAvgPower {
    pub room: String,
    /// Watts, averaged over every reading of the room.
    pub avg_power: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    pub room: String,
    pub status: PowerState,
    /// `None` when the room has no readings.
    pub latest: Option<Snapshot>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FloorView {
    pub floor: String,
    pub totals: Totals,
    pub avg_power: Vec<RoomAvgPower>,
    pub rooms: Vec<RoomSnapshot>,
}
