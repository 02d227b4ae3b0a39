pub mod handler;

pub use handler::{FlightController, Outcome};
