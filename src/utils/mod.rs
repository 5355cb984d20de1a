//! Utils Module - Helper Functions & Shared Utilities

pub mod constants;
pub mod decoder;
pub mod snapshot;
pub mod telemetry;

pub use constants::*;
pub use decoder::*;
pub use snapshot::*;
pub use telemetry::*;
