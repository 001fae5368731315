pub mod models;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::Result;

use self::models::{DeviceStatus, Reading};

pub const READINGS_FILE: &str = "energy_data.csv";
pub const STATUS_FILE: &str = "device_status.csv";

/// Locations of the two flat tables under the data directory.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub readings: PathBuf,
    pub status: PathBuf,
}

impl DataFiles {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            readings: dir.join(READINGS_FILE),
            status: dir.join(STATUS_FILE),
        }
    }

    /// Both tables are present on disk.
    pub fn exist(&self) -> bool {
        self.readings.is_file() && self.status.is_file()
    }
}

pub fn read_readings(path: &Path) -> Result<Vec<Reading>> {
    read_table(path)
}

pub fn write_readings(path: &Path, readings: &[Reading]) -> Result<()> {
    write_table_atomic(path, readings)
}

pub fn read_status(path: &Path) -> Result<Vec<DeviceStatus>> {
    read_table(path)
}

pub fn write_status(path: &Path, rows: &[DeviceStatus]) -> Result<()> {
    write_table_atomic(path, rows)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    debug!(path = %path.display(), rows = rows.len(), "table loaded");
    Ok(rows)
}

/// Serialize `rows` into a sibling temp file, then rename it over `path`.
/// Readers see either the old table or the new one, never a partial write.
fn write_table_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;

    debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}
