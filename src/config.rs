use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_FLOORS: &str =
    "Ground Floor:Room101|Room102,1st Floor:Room201|Room202,2nd Floor:Room301|Room302|Room303";

// ---------------------------------------------------------------------------
// Tariff
// ---------------------------------------------------------------------------

/// Conversion constants from energy to money and emissions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    /// Currency units (taka) per kWh.
    pub rate_per_kwh: f64,
    /// Grams of CO2 per kWh.
    pub carbon_g_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            rate_per_kwh: 5.5,
            carbon_g_per_kwh: 720.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Floor {
    pub name: String,
    pub rooms: Vec<String>,
}

/// Static floor → room mapping, fixed at startup. Floor and room order is
/// preserved as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    floors: Vec<Floor>,
}

impl Topology {
    pub fn new(floors: Vec<Floor>) -> Self {
        Self { floors }
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floor(&self, name: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.name == name)
    }

    /// All rooms, floor by floor, in configured order.
    pub fn rooms(&self) -> Vec<String> {
        self.floors.iter().flat_map(|f| f.rooms.iter().cloned()).collect()
    }
}

impl Default for Topology {
    fn default() -> Self {
        let floor = |name: &str, rooms: &[&str]| Floor {
            name: name.to_owned(),
            rooms: rooms.iter().map(|r| (*r).to_owned()).collect(),
        };
        Self::new(vec![
            floor("Ground Floor", &["Room101", "Room102"]),
            floor("1st Floor", &["Room201", "Room202"]),
            floor("2nd Floor", &["Room301", "Room302", "Room303"]),
        ])
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `energy_data.csv` and `device_status.csv`.
    pub data_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub tariff: Tariff,
    /// Seed of the synthetic telemetry stream.
    pub generator_seed: u64,
    /// First day of generated telemetry.
    pub dataset_start: NaiveDate,
    /// Last day of generated telemetry, inclusive.
    pub dataset_end: NaiveDate,
    /// Format: `"Floor A:Room1|Room2,Floor B:Room3"`.
    pub topology: Topology,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dataset_start = parse_day(&optional("DATASET_START", "2025-11-01"))
            .context("DATASET_START must be a YYYY-MM-DD date")?;
        let dataset_end = parse_day(&optional("DATASET_END", "2025-11-15"))
            .context("DATASET_END must be a YYYY-MM-DD date")?;
        anyhow::ensure!(
            dataset_start <= dataset_end,
            "DATASET_START ({dataset_start}) must not be after DATASET_END ({dataset_end})"
        );

        Ok(Self {
            data_dir: PathBuf::from(optional("DATA_DIR", "data")),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            tariff: Tariff {
                rate_per_kwh: optional("TARIFF_RATE", "5.5")
                    .parse()
                    .context("TARIFF_RATE must be a number")?,
                carbon_g_per_kwh: optional("CARBON_FACTOR", "720")
                    .parse()
                    .context("CARBON_FACTOR must be a number")?,
            },
            generator_seed: optional("GENERATOR_SEED", "42")
                .parse()
                .context("GENERATOR_SEED must be a non-negative integer")?,
            dataset_start,
            dataset_end,
            topology: parse_floors(&optional("BUILDING_FLOORS", DEFAULT_FLOORS))?,
        })
    }
}

/// Parse `"Floor A:Room1|Room2,Floor B:Room3"` into a `Topology`.
///
/// Returns an error if an entry lacks the `:` separator, a floor has no rooms,
/// a floor name repeats, or a room is listed more than once.
fn parse_floors(raw: &str) -> Result<Topology> {
    let mut floors: Vec<Floor> = Vec::new();

    for entry in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let (name, rooms) = entry.split_once(':').with_context(|| {
            format!("BUILDING_FLOORS entry must be 'floor:room|room', got: {entry:?}")
        })?;
        let name = name.trim().to_owned();
        let rooms: Vec<String> = rooms
            .split('|')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .collect();

        anyhow::ensure!(!rooms.is_empty(), "floor {name:?} in BUILDING_FLOORS has no rooms");
        anyhow::ensure!(
            floors.iter().all(|f| f.name != name),
            "floor {name:?} appears twice in BUILDING_FLOORS"
        );
        for (i, room) in rooms.iter().enumerate() {
            let seen = rooms[..i].contains(room) || floors.iter().any(|f| f.rooms.contains(room));
            anyhow::ensure!(
                !seen,
                "room {room:?} appears on more than one floor in BUILDING_FLOORS"
            );
        }
        floors.push(Floor { name, rooms });
    }

    Ok(Topology::new(floors))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date: {raw:?}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
