//! # Night Charger - overnight home battery charge planning
//!
//! A synchronous decision engine for a home battery that charges from the
//! grid at night, when energy is cheap, so that stored energy plus solar
//! production covers the next day's consumption.
//!
//! ## Architecture
//!
//! - `config`: Typed YAML configuration and validation
//! - `logging`: Structured logging and tracing
//! - `planner`: Target SOC and overnight grid energy
//! - `ev`: EV energy requests and grid bypass decisions
//! - `forecaster`: Consumption learning and weekday forecasts
//! - `savings`: Night versus day tariff accounting
//! - `session`: Night charge session tracking
//! - `persistence`: Restart-surviving state snapshot
//!
//! Components hold no I/O and no timers. Each is built from a [`Config`]
//! and a [`logging::StructuredLogger`] handle, and mutating calls on one
//! instance must be serialized by the host.

pub mod config;
pub mod error;
pub mod ev;
pub mod forecaster;
pub mod logging;
pub mod persistence;
pub mod planner;
pub mod savings;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{NightChargerError, Result};
pub use ev::{EvDecision, EvEvaluator, EvRequest, EvSession};
pub use forecaster::ConsumptionForecaster;
pub use persistence::PersistentState;
pub use planner::{ChargePlanner, EnergyBalance, PlanningInput, PlanningResult};
pub use savings::SavingsAccountant;
pub use session::ChargeSessionManager;
