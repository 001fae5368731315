pub mod api;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod query;
pub mod status;
pub mod telemetry;
