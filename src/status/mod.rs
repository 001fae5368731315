pub mod service;

use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use crate::{
    db::{self, models::DeviceStatus},
    error::Result,
};

pub use self::service::StatusService;

/// Durable backing of the status table.
///
/// The contract is whole-table: `load` returns every row in table order and
/// `save` replaces the table. Readers must never observe a partial `save`.
pub trait StatusStore: Send + Sync {
    fn load(&self) -> Result<Vec<DeviceStatus>>;
    fn save(&self, rows: &[DeviceStatus]) -> Result<()>;
}

/// `device_status.csv`, rewritten through a temp file and rename.
#[derive(Debug, Clone)]
pub struct CsvStatusStore {
    path: PathBuf,
}

impl CsvStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusStore for CsvStatusStore {
    fn load(&self) -> Result<Vec<DeviceStatus>> {
        db::read_status(&self.path)
    }

    fn save(&self, rows: &[DeviceStatus]) -> Result<()> {
        db::write_status(&self.path, rows)
    }
}

/// Process-local table, for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    rows: Mutex<Vec<DeviceStatus>>,
}

impl MemoryStatusStore {
    pub fn new(rows: Vec<DeviceStatus>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self) -> Result<Vec<DeviceStatus>> {
        Ok(self.rows.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, rows: &[DeviceStatus]) -> Result<()> {
        *self.rows.lock().unwrap_or_else(PoisonError::into_inner) = rows.to_vec();
        Ok(())
    }
}
