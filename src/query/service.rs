use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use tracing::debug;

use super::{
    hourly_series, latest_activity, BuildingSummary, FloorView, RoomAvgPower, RoomSnapshot,
    RoomView, Savings, Snapshot, Totals,
};
use crate::{
    config::{Tariff, Topology},
    dataset::Dataset,
    db::models::PowerState,
    error::{EnergyError, Result},
    status::StatusService,
};

/// Read-only views over the dataset, joined with the live status table.
///
/// The status table is reloaded on every call so views reflect the latest
/// mutation; the dataset itself never changes.
#[derive(Clone)]
pub struct QueryService {
    dataset: Dataset,
    status: StatusService,
    topology: Arc<Topology>,
    tariff: Tariff,
}

impl QueryService {
    pub fn new(dataset: Dataset, status: StatusService, topology: Topology, tariff: Tariff) -> Self {
        Self {
            dataset,
            status,
            topology: Arc::new(topology),
            tariff,
        }
    }

    /// Dates covered by the dataset; the window used when a caller gives none.
    pub fn default_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.dataset.date_range()
    }

    /// Totals over every reading, plus topology and the status of every room.
    pub fn building_summary(&self) -> Result<BuildingSummary> {
        let status = self
            .status
            .list()?
            .into_iter()
            .map(|s| (s.room, s.status))
            .collect();

        Ok(BuildingSummary {
            totals: Totals::of(self.dataset.all()),
            floors: self.topology.floors().to_vec(),
            status,
        })
    }

    /// One room between two calendar dates, both inclusive.
    pub fn room_view(&self, room: &str, start: NaiveDate, end: NaiveDate) -> Result<RoomView> {
        let status = self.status.get(room)?;

        if start > end {
            return Err(EnergyError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let readings = self.dataset.room(room);
        let lo = readings.partition_point(|r| r.timestamp.date() < start);
        let hi = readings.partition_point(|r| r.timestamp.date() <= end);
        let window = &readings[lo..hi.max(lo)];

        let latest = latest_activity(window).ok_or_else(|| EnergyError::EmptyWindow {
            room: room.to_owned(),
            start,
            end,
            status: status.status,
        })?;

        let totals = Totals::of(window);
        debug!(room = %room, %start, %end, readings = window.len(), "Room window resolved");

        Ok(RoomView {
            room: room.to_owned(),
            start,
            end,
            series: hourly_series(window),
            totals,
            savings: Savings::estimate(&totals, &self.tariff),
            latest: Snapshot::from(latest),
            status: status.status,
            schedule_on: status.schedule_on,
            schedule_off: status.schedule_off,
        })
    }

    /// Totals, mean power and latest snapshot for each room on a floor.
    pub fn floor_view(&self, floor_name: &str) -> Result<FloorView> {
        let floor = self
            .topology
            .floor(floor_name)
            .ok_or_else(|| EnergyError::FloorNotFound(floor_name.to_owned()))?;

        let status: HashMap<String, PowerState> = self
            .status
            .list()?
            .into_iter()
            .map(|s| (s.room, s.status))
            .collect();

        let mut totals = Totals::default();
        let mut avg_power = Vec::with_capacity(floor.rooms.len());
        let mut rooms = Vec::with_capacity(floor.rooms.len());

        for room in &floor.rooms {
            let readings = self.dataset.room(room);
            totals = totals.add(Totals::of(readings));

            if !readings.is_empty() {
                let sum: f64 = readings.iter().map(|r| r.power).sum();
                avg_power.push(RoomAvgPower {
                    room: room.clone(),
                    avg_power: sum / readings.len() as f64,
                });
            }

            rooms.push(RoomSnapshot {
                room: room.clone(),
                status: status.get(room).copied().unwrap_or(PowerState::Off),
                latest: latest_activity(readings).map(Snapshot::from),
            });
        }

        Ok(FloorView {
            floor: floor.name.clone(),
            totals,
            avg_power,
            rooms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use chrono::NaiveDateTime;

    use super::*;
    use crate::{
        db::models::{DeviceStatus, Reading},
        status::MemoryStatusStore,
        telemetry::generator::{generate, initial_status, GeneratorConfig},
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn ts(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    fn status_service(rows: Vec<DeviceStatus>) -> StatusService {
        StatusService::new(Arc::new(MemoryStatusStore::new(rows)))
    }

    // -----------------------------------------------------------------------
    // Small hand-built dataset
    // -----------------------------------------------------------------------

    fn reading(room: &str, timestamp: NaiveDateTime, current: f64) -> Reading {
        crate::telemetry::generator::derive_reading(timestamp, room, 220.0, current, &Tariff::default())
    }

    fn small() -> QueryService {
        let readings = vec![
            reading("Room101", ts(3, 9, 0), 5.0),
            reading("Room101", ts(3, 9, 30), 0.0),
            reading("Room101", ts(4, 10, 0), 6.0),
            reading("Room101", ts(4, 10, 1), 0.2),
            reading("Room102", ts(3, 9, 0), 0.0),
        ];
        let status = status_service(vec![
            DeviceStatus::with_defaults("Room101"),
            DeviceStatus::with_defaults("Room102"),
        ]);
        QueryService::new(
            Dataset::from_readings(readings),
            status,
            Topology::default(),
            Tariff::default(),
        )
    }

    #[test]
    fn room_view_filters_by_calendar_date() {
        let view = small().room_view("Room101", day(4), day(4)).unwrap();
        assert_eq!(view.series.len(), 1);
        assert_eq!(view.series[0].hour, ts(4, 10, 0));
        assert_eq!(view.series[0].samples, 2);
        assert_eq!(view.latest.timestamp, ts(4, 10, 0));
        assert_eq!(view.status, PowerState::On);
        assert_eq!(view.schedule_on, "08:00");
    }

    #[test]
    fn room_view_latest_falls_back_when_nothing_is_active() {
        let view = small().room_view("Room102", day(3), day(3)).unwrap();
        assert_eq!(view.latest.timestamp, ts(3, 9, 0));
        assert_eq!(view.latest.current, 0.0);
        assert_eq!(view.totals, Totals::default());
    }

    #[test]
    fn room_view_totals_and_savings() {
        let q = small();
        let view = q.room_view("Room101", day(1), day(15)).unwrap();
        let expected = Totals::of(q.dataset.room("Room101"));
        assert_eq!(view.totals, expected);
        assert!(close(view.savings.energy_kwh, expected.energy_kwh * 0.2));
        assert!(close(view.savings.bill_taka, expected.energy_kwh * 0.2 * 5.5));
    }

    #[test]
    fn room_view_unknown_room() {
        let err = small().room_view("RoomXYZ", day(1), day(15)).unwrap_err();
        assert!(matches!(err, EnergyError::RoomNotFound(r) if r == "RoomXYZ"));
    }

    #[test]
    fn room_view_empty_window() {
        let err = small().room_view("Room101", day(10), day(12)).unwrap_err();
        assert!(matches!(err, EnergyError::EmptyWindow { ref room, .. } if room == "Room101"));
    }

    #[test]
    fn room_view_inverted_window_is_invalid() {
        let err = small().room_view("Room101", day(4), day(3)).unwrap_err();
        assert!(matches!(err, EnergyError::InvalidInput(_)));
    }

    #[test]
    fn room_existence_follows_status_table_not_readings() {
        let q = small();
        // readings exist, status row removed
        q.status.delete_room("Room102").unwrap();
        assert!(matches!(
            q.room_view("Room102", day(3), day(3)),
            Err(EnergyError::RoomNotFound(_))
        ));

        // status row exists, no readings
        q.status.add_room("Room404").unwrap();
        q.status.toggle("Room404").unwrap();
        assert!(matches!(
            q.room_view("Room404", day(3), day(3)),
            Err(EnergyError::EmptyWindow { status: PowerState::Off, .. })
        ));
    }

    #[test]
    fn room_view_reflects_latest_toggle() {
        let q = small();
        q.status.toggle("Room101").unwrap();
        let view = q.room_view("Room101", day(3), day(4)).unwrap();
        assert_eq!(view.status, PowerState::Off);
    }

    #[test]
    fn floor_view_joins_status_and_defaults_missing_rows_to_off() {
        let q = small();
        q.status.toggle("Room101").unwrap();
        q.status.delete_room("Room102").unwrap();

        let view = q.floor_view("Ground Floor").unwrap();
        assert_eq!(view.rooms.len(), 2);
        assert_eq!(view.rooms[0].status, PowerState::Off);
        assert_eq!(view.rooms[1].status, PowerState::Off);
        assert_eq!(view.rooms[0].latest.as_ref().unwrap().timestamp, ts(4, 10, 0));
        assert_eq!(view.rooms[1].latest.as_ref().unwrap().timestamp, ts(3, 9, 0));
    }

    #[test]
    fn floor_view_skips_rooms_without_readings() {
        let view = small().floor_view("1st Floor").unwrap();
        assert!(view.avg_power.is_empty());
        assert_eq!(view.rooms.len(), 2);
        assert!(view.rooms.iter().all(|r| r.latest.is_none()));
        assert_eq!(view.totals, Totals::default());
    }

    #[test]
    fn floor_view_unknown_floor() {
        let err = small().floor_view("Basement").unwrap_err();
        assert!(matches!(err, EnergyError::FloorNotFound(f) if f == "Basement"));
    }

    #[test]
    fn building_summary_lists_status_of_every_row() {
        let q = small();
        q.status.add_room("Room404").unwrap();
        q.status.toggle("Room404").unwrap();

        let summary = q.building_summary().unwrap();
        assert_eq!(summary.status.len(), 3);
        assert_eq!(summary.status["Room404"], PowerState::Off);
        assert_eq!(summary.floors.len(), 3);
        assert!(close(
            summary.totals.energy_kwh,
            Totals::of(q.dataset.all()).energy_kwh
        ));
    }

    // -----------------------------------------------------------------------
    // Full generated dataset: 7 rooms, 1st-15th November
    // -----------------------------------------------------------------------

    fn full_dataset() -> &'static Dataset {
        static DATA: OnceLock<Dataset> = OnceLock::new();
        DATA.get_or_init(|| {
            let config = GeneratorConfig {
                rooms: Topology::default().rooms(),
                start: day(1),
                end: day(15),
                seed: 42,
                tariff: Tariff::default(),
            };
            Dataset::from_readings(generate(&config).unwrap())
        })
    }

    fn full() -> QueryService {
        let topology = Topology::default();
        let status = status_service(initial_status(&topology.rooms()));
        QueryService::new(full_dataset().clone(), status, topology, Tariff::default())
    }

    #[test]
    fn full_dataset_has_one_row_per_room_minute() {
        assert_eq!(full_dataset().len(), 151_200);
        assert_eq!(full().default_window(), Some((day(1), day(15))));
    }

    #[test]
    fn full_range_room_has_one_bucket_per_hour() {
        let view = full().room_view("Room101", day(1), day(15)).unwrap();
        assert_eq!(view.series.len(), 360);
        assert!(view.series.iter().all(|p| p.samples == 60));
        assert!(view.totals.energy_kwh > 0.0);
        assert!(view.latest.current > 0.5);
    }

    #[test]
    fn weekend_window_is_idle() {
        let view = full().room_view("Room101", day(1), day(2)).unwrap();
        assert_eq!(view.series.len(), 48);
        assert_eq!(view.totals.energy_kwh, 0.0);
        // no active minute, so the last reading of Sunday is reported
        assert_eq!(view.latest.timestamp, ts(2, 23, 59));
    }

    #[test]
    fn ground_floor_matches_its_rooms() {
        let q = full();
        let floor = q.floor_view("Ground Floor").unwrap();
        let r1 = q.room_view("Room101", day(1), day(15)).unwrap().totals;
        let r2 = q.room_view("Room102", day(1), day(15)).unwrap().totals;

        assert!(close(floor.totals.energy_kwh, r1.energy_kwh + r2.energy_kwh));
        assert!(close(floor.totals.bill_taka, r1.bill_taka + r2.bill_taka));
        assert!(close(floor.totals.carbon_gco2, r1.carbon_gco2 + r2.carbon_gco2));
        assert_eq!(floor.avg_power.len(), 2);
        assert!(floor.avg_power[1].avg_power > floor.avg_power[0].avg_power);
    }

    #[test]
    fn building_equals_floors_equals_rooms() {
        let q = full();
        let building = q.building_summary().unwrap().totals;

        let floors = Topology::default()
            .floors()
            .iter()
            .map(|f| q.floor_view(&f.name).unwrap().totals)
            .fold(Totals::default(), Totals::add);

        let rooms = Topology::default()
            .rooms()
            .iter()
            .map(|r| q.room_view(r, day(1), day(15)).unwrap().totals)
            .fold(Totals::default(), Totals::add);

        for (a, b, c) in [
            (building.energy_kwh, floors.energy_kwh, rooms.energy_kwh),
            (building.bill_taka, floors.bill_taka, rooms.bill_taka),
            (building.carbon_gco2, floors.carbon_gco2, rooms.carbon_gco2),
        ] {
            assert!(close(a, b), "building {a} vs floors {b}");
            assert!(close(b, c), "floors {b} vs rooms {c}");
        }
        assert!(building.energy_kwh > 0.0);
    }

    #[test]
    fn unknown_room_and_floor_on_full_dataset() {
        let q = full();
        assert!(matches!(
            q.room_view("RoomXYZ", day(1), day(15)),
            Err(EnergyError::RoomNotFound(_))
        ));
        assert!(matches!(q.floor_view("Basement"), Err(EnergyError::FloorNotFound(_))));
    }
}
