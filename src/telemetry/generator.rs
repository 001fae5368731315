use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::{
    config::Tariff,
    db::models::{DeviceStatus, Reading},
    error::{EnergyError, Result},
};

const BASE_VOLTAGE: f64 = 220.0;
const CURRENT_STD_DEV: f64 = 0.6;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parameters of one synthetic dataset.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Rooms in ordinal order; a room's position drives its electrical profile.
    pub rooms: Vec<String>,
    pub start: NaiveDate,
    /// Inclusive; the last generated minute is `end 23:59`.
    pub end: NaiveDate,
    pub seed: u64,
    pub tariff: Tariff,
}

/// Per-room electrical profile derived from the room's ordinal position.
#[derive(Debug, Clone, Copy)]
struct RoomProfile {
    voltage_std_dev: f64,
    usage_factor: f64,
    mean_current: f64,
}

impl RoomProfile {
    fn for_index(idx: usize) -> Self {
        let idx = idx as f64;
        Self {
            voltage_std_dev: 3.0 + 0.5 * idx,
            usage_factor: 0.6 + 0.08 * idx,
            mean_current: 4.5 + 0.7 * idx,
        }
    }
}

/// Weekdays, 08:00 inclusive to 20:00 exclusive.
pub fn is_business_hours(ts: NaiveDateTime) -> bool {
    let hour = ts.hour();
    let weekday = ts.weekday();
    (8..20).contains(&hour) && !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Round half to even at `decimals` places.
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Every minute from `start 00:00` through `end 23:59`.
fn minute_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
    let first = start.and_time(chrono::NaiveTime::MIN);
    let days = (end - start).num_days() + 1;
    let count = (days.max(0) * MINUTES_PER_DAY) as usize;
    (0..count)
        .map(|i| first + Duration::minutes(i as i64))
        .collect()
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        EnergyError::Generator(format!("normal({mean}, {std_dev}) rejected: {e}"))
    })
}

/// Generate one reading per (room, minute), rooms in order, minutes ascending.
///
/// All draws come from a single `StdRng` seeded once. For each room the stream
/// is consumed as: every voltage draw, then every off-draw, then every current
/// draw. Changing that order changes the dataset.
pub fn generate(config: &GeneratorConfig) -> Result<Vec<Reading>> {
    if config.start > config.end {
        return Err(EnergyError::InvalidInput(format!(
            "generator range starts after it ends: {} > {}",
            config.start, config.end
        )));
    }

    let minutes = minute_range(config.start, config.end);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut readings = Vec::with_capacity(minutes.len() * config.rooms.len());

    for (idx, room) in config.rooms.iter().enumerate() {
        let profile = RoomProfile::for_index(idx);
        let voltage_dist = normal(BASE_VOLTAGE, profile.voltage_std_dev)?;
        let current_dist = normal(profile.mean_current, CURRENT_STD_DEV)?;
        let off_probability = 1.0 - profile.usage_factor;

        let voltages: Vec<f64> = (0..minutes.len())
            .map(|_| voltage_dist.sample(&mut rng))
            .collect();
        let forced_off: Vec<bool> = (0..minutes.len())
            .map(|_| rng.gen::<f64>() < off_probability)
            .collect();
        let currents: Vec<f64> = (0..minutes.len())
            .map(|_| current_dist.sample(&mut rng))
            .collect();

        for (i, &timestamp) in minutes.iter().enumerate() {
            let is_on = is_business_hours(timestamp) && !forced_off[i];
            let voltage = voltages[i];
            let current = if is_on { currents[i] } else { 0.0 };
            readings.push(derive_reading(
                timestamp,
                room,
                voltage,
                current,
                &config.tariff,
            ));
        }
    }

    Ok(readings)
}

/// Build a reading from raw voltage and current, applying the persisted
/// rounding: power from the raw product, energy from raw power, bill and
/// carbon from rounded energy.
pub fn derive_reading(
    timestamp: NaiveDateTime,
    room: &str,
    voltage: f64,
    current: f64,
    tariff: &Tariff,
) -> Reading {
    let power = voltage * current;
    let energy_kwh = round_dp(power / 1000.0 / 60.0, 6);
    Reading {
        timestamp,
        room: room.to_owned(),
        voltage: round_dp(voltage, 2),
        current: round_dp(current, 2),
        power: round_dp(power, 1),
        energy_kwh,
        bill_taka: round_dp(energy_kwh * tariff.rate_per_kwh, 2),
        carbon_gco2: round_dp(energy_kwh * tariff.carbon_g_per_kwh, 1),
    }
}

/// Status table written alongside a fresh dataset: every room on, default schedule.
pub fn initial_status(rooms: &[String]) -> Vec<DeviceStatus> {
    rooms.iter().map(DeviceStatus::with_defaults).collect()
}
