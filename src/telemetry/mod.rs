pub mod generator;

use tracing::info;

use crate::{
    db::{self, DataFiles},
    error::Result,
};

use self::generator::{generate, initial_status, GeneratorConfig};

/// Outcome of [`bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// Both tables were already on disk; nothing was written.
    Existing,
    /// A fresh dataset and status table were written.
    Generated { readings: usize },
}

/// Write the synthetic dataset and the initial status table unless both
/// already exist. A missing table regenerates both, so the pair never drifts.
pub fn bootstrap(files: &DataFiles, config: &GeneratorConfig) -> Result<Bootstrap> {
    if files.exist() {
        info!(
            readings = %files.readings.display(),
            status = %files.status.display(),
            "Persisted dataset found; skipping generation"
        );
        return Ok(Bootstrap::Existing);
    }

    info!(
        rooms = config.rooms.len(),
        start = %config.start,
        end = %config.end,
        seed = config.seed,
        "Generating synthetic telemetry"
    );

    let readings = generate(config)?;
    db::write_readings(&files.readings, &readings)?;
    db::write_status(&files.status, &initial_status(&config.rooms))?;

    info!(rows = readings.len(), path = %files.readings.display(), "Dataset written");
    Ok(Bootstrap::Generated {
        readings: readings.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        config::Tariff,
        db::models::{DeviceStatus, PowerState},
    };

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            rooms: vec!["Room101".into(), "Room102".into()],
            start: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            seed: 42,
            tariff: Tariff::default(),
        }
    }

    #[test]
    fn first_run_writes_both_tables() {
        let dir = tempdir().unwrap();
        let files = DataFiles::in_dir(dir.path().join("data"));

        let outcome = bootstrap(&files, &config()).unwrap();

        assert_eq!(outcome, Bootstrap::Generated { readings: 2 * 1440 });
        assert_eq!(db::read_readings(&files.readings).unwrap().len(), 2 * 1440);
        let status = db::read_status(&files.status).unwrap();
        assert_eq!(
            status,
            vec![
                DeviceStatus::with_defaults("Room101"),
                DeviceStatus::with_defaults("Room102"),
            ]
        );
    }

    #[test]
    fn regeneration_is_byte_identical() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let files_a = DataFiles::in_dir(a.path());
        let files_b = DataFiles::in_dir(b.path());

        bootstrap(&files_a, &config()).unwrap();
        bootstrap(&files_b, &config()).unwrap();

        assert_eq!(
            fs::read(&files_a.readings).unwrap(),
            fs::read(&files_b.readings).unwrap()
        );
        assert_eq!(
            fs::read(&files_a.status).unwrap(),
            fs::read(&files_b.status).unwrap()
        );
    }

    #[test]
    fn existing_tables_are_left_alone() {
        let dir = tempdir().unwrap();
        let files = DataFiles::in_dir(dir.path());
        bootstrap(&files, &config()).unwrap();

        let mut status = db::read_status(&files.status).unwrap();
        status[0].status = PowerState::Off;
        db::write_status(&files.status, &status).unwrap();

        assert_eq!(bootstrap(&files, &config()).unwrap(), Bootstrap::Existing);
        assert_eq!(db::read_status(&files.status).unwrap()[0].status, PowerState::Off);
    }

    #[test]
    fn missing_status_table_regenerates_both() {
        let dir = tempdir().unwrap();
        let files = DataFiles::in_dir(dir.path());
        bootstrap(&files, &config()).unwrap();
        fs::remove_file(&files.status).unwrap();

        assert!(matches!(
            bootstrap(&files, &config()).unwrap(),
            Bootstrap::Generated { .. }
        ));
        assert!(files.exist());
    }
}
