pub mod config;
pub mod error;
pub mod geo;
pub mod memory;
pub mod telemetry;
pub mod time;
pub mod traits;
pub mod types;

pub use config::{AggregatorConfig, Config, DetectionConfig, SeverityThresholds};
pub use error::FirebirdError;
pub use geo::distance_km;
pub use memory::{MemoryStore, Snapshot};
pub use traits::*;
pub use types::*;
