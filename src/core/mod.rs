//! Core Module - Route Optimizer, Risk Scorer & Advisory Facade

pub mod advisor;
pub mod registry;
pub mod risk_score;
pub mod router;
pub mod rules;
pub mod tables;

pub use advisor::*;
pub use registry::*;
pub use risk_score::*;
pub use router::*;
pub use rules::*;
pub use tables::*;
