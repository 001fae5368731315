use std::{collections::BTreeMap, path::Path, sync::Arc};

use chrono::NaiveDate;
use tracing::info;

use crate::{db, db::models::Reading, error::Result};

/// The reading set, loaded once per process and never written afterwards.
///
/// Wrapped in `Arc` so it can be cheaply cloned into every handler. No lock:
/// nothing mutates it after construction.
#[derive(Clone, Default)]
pub struct Dataset {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Readings per room, ascending by timestamp. Rooms are kept sorted so
    /// sums over `all()` come out the same on every run.
    by_room: BTreeMap<String, Vec<Reading>>,
    len: usize,
    dates: Option<(NaiveDate, NaiveDate)>,
}

impl Dataset {
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        let len = readings.len();
        let mut by_room: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
        for r in readings {
            by_room.entry(r.room.clone()).or_default().push(r);
        }
        for rows in by_room.values_mut() {
            rows.sort_by_key(|r| r.timestamp);
        }

        let dates = by_room
            .values()
            .filter_map(|rows| Some((rows.first()?.timestamp.date(), rows.last()?.timestamp.date())))
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)));

        Self {
            inner: Arc::new(Inner { by_room, len, dates }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let dataset = Self::from_readings(db::read_readings(path)?);
        info!(
            path = %path.display(),
            rows = dataset.len(),
            rooms = dataset.inner.by_room.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Readings of one room in timestamp order; empty if the room never reported.
    pub fn room(&self, room: &str) -> &[Reading] {
        self.inner
            .by_room
            .get(room)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every reading, room by room in name order.
    pub fn all(&self) -> impl Iterator<Item = &Reading> {
        self.inner.by_room.values().flatten()
    }

    /// First and last calendar date covered by any reading.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.inner.dates
    }
}
