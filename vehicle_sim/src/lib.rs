// lib.rs — loopback stand-in for the flight controller's link side
pub mod commands;
pub mod config;
pub mod errors;
pub mod net;
pub mod sensors;
pub mod telemetry;
pub mod vehicle;

pub use config::VehicleConfig;
pub use errors::SimError;
pub use vehicle::{VehicleHandle, spawn};
