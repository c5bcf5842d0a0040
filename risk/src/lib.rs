//! Multi-factor operational risk for drone flights: per-category threshold
//! scores fused into a posterior risk, plus a short stochastic forecast.

pub mod config;
pub mod engine;
pub mod forecast;
pub mod model;
pub mod scoring;

pub use config::{CategoryWeights, RiskConfig};
pub use engine::{RiskAssessment, RiskEngine};
pub use forecast::ForecastPoint;
pub use model::{RiskCategory, RiskNode};
