//! Domain-level building blocks shared across the monitor API, the monitor
//! library and the notification listener: environment configuration, the
//! transaction record model, storage traits and telemetry wiring.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use model::*;
pub use storage::*;
