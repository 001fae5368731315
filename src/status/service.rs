use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveTime;
use tracing::{debug, info};

use super::StatusStore;
use crate::{
    db::models::DeviceStatus,
    error::{EnergyError, Result},
};

/// Device controls over a [`StatusStore`].
///
/// Every mutation reloads the whole table, edits it and saves it back. The
/// write lock serializes those cycles inside this process; separate processes
/// sharing one store still race, last writer wins.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn StatusStore>,
    write_lock: Arc<Mutex<()>>,
}

impl StatusService {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current table, in stored order.
    pub fn list(&self) -> Result<Vec<DeviceStatus>> {
        self.store.load()
    }

    pub fn get(&self, room: &str) -> Result<DeviceStatus> {
        self.store
            .load()?
            .into_iter()
            .find(|s| s.room == room)
            .ok_or_else(|| EnergyError::RoomNotFound(room.to_owned()))
    }

    /// Flip On ↔ Off.
    pub fn toggle(&self, room: &str) -> Result<Vec<DeviceStatus>> {
        self.mutate(|rows| {
            let row = find_mut(rows, room)?;
            row.status = row.status.toggled();
            info!(room = %room, status = %row.status, "Device toggled");
            Ok(true)
        })
    }

    /// Overwrite the on/off times. Both must be `HH:MM`.
    pub fn set_schedule(&self, room: &str, on_time: &str, off_time: &str) -> Result<Vec<DeviceStatus>> {
        let on_time = parse_time_of_day(on_time)?;
        let off_time = parse_time_of_day(off_time)?;

        self.mutate(|rows| {
            let row = find_mut(rows, room)?;
            row.schedule_on = on_time;
            row.schedule_off = off_time;
            info!(
                room = %room,
                schedule_on = %row.schedule_on,
                schedule_off = %row.schedule_off,
                "Schedule updated"
            );
            Ok(true)
        })
    }

    /// Register a room with default status and schedule. Blank or already
    /// known identifiers are ignored.
    pub fn add_room(&self, room: &str) -> Result<Vec<DeviceStatus>> {
        let room = room.trim();
        self.mutate(|rows| {
            if room.is_empty() || rows.iter().any(|s| s.room == room) {
                debug!(room = %room, "Add ignored: blank or existing room");
                return Ok(false);
            }
            rows.push(DeviceStatus::with_defaults(room));
            info!(room = %room, "Room added");
            Ok(true)
        })
    }

    /// Remove a room's row. Unknown rooms are ignored.
    pub fn delete_room(&self, room: &str) -> Result<Vec<DeviceStatus>> {
        self.mutate(|rows| {
            let before = rows.len();
            rows.retain(|s| s.room != room);
            if rows.len() == before {
                debug!(room = %room, "Delete ignored: unknown room");
                return Ok(false);
            }
            info!(room = %room, "Room deleted");
            Ok(true)
        })
    }

    /// Load, apply `edit`, and save when `edit` reports a change.
    fn mutate<F>(&self, edit: F) -> Result<Vec<DeviceStatus>>
    where
        F: FnOnce(&mut Vec<DeviceStatus>) -> Result<bool>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows = self.store.load()?;
        if edit(&mut rows)? {
            self.store.save(&rows)?;
        }
        Ok(rows)
    }
}

fn find_mut<'a>(rows: &'a mut [DeviceStatus], room: &str) -> Result<&'a mut DeviceStatus> {
    rows.iter_mut()
        .find(|s| s.room == room)
        .ok_or_else(|| EnergyError::RoomNotFound(room.to_owned()))
}

/// Validate `HH:MM` and return it zero-padded.
fn parse_time_of_day(raw: &str) -> Result<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| EnergyError::InvalidInput(format!("time of day must be HH:MM, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::PowerState,
        status::{CsvStatusStore, MemoryStatusStore},
    };

    fn service() -> StatusService {
        StatusService::new(Arc::new(MemoryStatusStore::new(vec![
            DeviceStatus::with_defaults("Room101"),
            DeviceStatus::with_defaults("Room102"),
        ])))
    }

    #[test]
    fn toggle_flips_and_persists() {
        let svc = service();
        let rows = svc.toggle("Room101").unwrap();
        assert_eq!(rows[0].status, PowerState::Off);
        assert_eq!(svc.get("Room101").unwrap().status, PowerState::Off);

        svc.toggle("Room101").unwrap();
        assert_eq!(svc.get("Room101").unwrap().status, PowerState::On);
        assert_eq!(svc.get("Room102").unwrap().status, PowerState::On);
    }

    #[test]
    fn toggle_unknown_room_errors() {
        let err = service().toggle("RoomXYZ").unwrap_err();
        assert!(matches!(err, EnergyError::RoomNotFound(r) if r == "RoomXYZ"));
    }

    #[test]
    fn set_schedule_overwrites_times() {
        let svc = service();
        svc.set_schedule("Room102", "7:30", "18:45").unwrap();
        let row = svc.get("Room102").unwrap();
        assert_eq!(row.schedule_on, "07:30");
        assert_eq!(row.schedule_off, "18:45");
        assert_eq!(row.status, PowerState::On);
    }

    #[test]
    fn set_schedule_unknown_room_errors() {
        let err = service().set_schedule("RoomXYZ", "08:00", "20:00").unwrap_err();
        assert!(matches!(err, EnergyError::RoomNotFound(_)));
    }

    #[test]
    fn set_schedule_rejects_malformed_time() {
        let svc = service();
        let err = svc.set_schedule("Room101", "8am", "20:00").unwrap_err();
        assert!(matches!(err, EnergyError::InvalidInput(_)));
        let err = svc.set_schedule("Room101", "08:00", "25:00").unwrap_err();
        assert!(matches!(err, EnergyError::InvalidInput(_)));
        assert_eq!(svc.get("Room101").unwrap().schedule_on, "08:00");
    }

    #[test]
    fn add_room_appends_defaults() {
        let svc = service();
        let rows = svc.add_room("  Room404 ").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], DeviceStatus::with_defaults("Room404"));
    }

    #[test]
    fn add_existing_or_blank_room_is_a_no_op() {
        let svc = service();
        svc.toggle("Room101").unwrap();

        let rows = svc.add_room("Room101").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, PowerState::Off);

        assert_eq!(svc.add_room("   ").unwrap().len(), 2);
        assert_eq!(svc.add_room("").unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_row_permanently() {
        let svc = service();
        let rows = svc.delete_room("Room101").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(svc.get("Room101"), Err(EnergyError::RoomNotFound(_))));
        assert!(matches!(svc.toggle("Room101"), Err(EnergyError::RoomNotFound(_))));
    }

    #[test]
    fn delete_unknown_room_is_a_no_op() {
        assert_eq!(service().delete_room("RoomXYZ").unwrap().len(), 2);
    }

    #[test]
    fn add_toggle_delete_round_trip() {
        let svc = service();
        svc.add_room("X").unwrap();
        svc.toggle("X").unwrap();
        assert_eq!(svc.get("X").unwrap().status, PowerState::Off);

        svc.delete_room("X").unwrap();
        assert!(matches!(svc.toggle("X"), Err(EnergyError::RoomNotFound(_))));
        assert!(matches!(
            svc.set_schedule("X", "08:00", "20:00"),
            Err(EnergyError::RoomNotFound(_))
        ));
    }

    #[test]
    fn mutations_reach_the_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device_status.csv");
        let store = CsvStatusStore::new(&path);
        store.save(&[DeviceStatus::with_defaults("Room101")]).unwrap();

        let svc = StatusService::new(Arc::new(store));
        svc.toggle("Room101").unwrap();
        svc.add_room("Room102").unwrap();

        let reread = CsvStatusStore::new(&path).load().unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread[0].status, PowerState::Off);
        assert_eq!(reread[1].room, "Room102");
    }

    #[test]
    fn concurrent_toggles_are_serialized() {
        let svc = service();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                std::thread::spawn(move || svc.toggle("Room101").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // an even number of flips lands back on the initial state
        assert_eq!(svc.get("Room101").unwrap().status, PowerState::On);
    }
}
