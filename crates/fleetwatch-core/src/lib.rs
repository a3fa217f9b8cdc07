//! `fleetwatch-core`: configuration, error and identity types shared by
//! every fleetwatch crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{FleetwatchConfig, Purpose};
pub use error::{CoreError, Result};
pub use types::{DocumentType, VehicleId};
