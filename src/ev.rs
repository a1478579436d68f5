//! EV energy request evaluation
//!
//! Decides, for an EV announcing an energy requirement, whether the request
//! is acted on now, saved for the next window, or clears a previous request,
//! and whether the grid bypass should carry the EV load.
//!
//! The evaluator is stateless. The timer lives with the caller (see
//! [`EvSession`]) and timeouts are only detected when `evaluate` runs, so
//! hosts must re-invoke it periodically during the window.

use crate::config::{Config, TimeWindow};
use crate::logging::StructuredLogger;
use crate::planner::EnergyBalance;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

mod session;

pub use session::{EvChargeState, EvSession};

/// Kind of outcome, mirroring the variants of [`EvDecision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvSetResult {
    /// Acted on inside the request window
    Processed,
    /// Stored for later, outside the request window
    Saved,
    /// EV requirement cleared inside the window
    Reset,
}

impl EvSetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Saved => "saved",
            Self::Reset => "reset",
        }
    }
}

/// Why the bypass ended up on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    Timeout,
    SufficientEnergy,
    InsufficientEnergy,
}

impl BypassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::SufficientEnergy => "sufficient_energy",
            Self::InsufficientEnergy => "insufficient_energy",
        }
    }
}

/// Bypass actuator command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassDecision {
    pub activate: bool,
    pub reason: BypassReason,
}

impl BypassDecision {
    /// Timeout forces the bypass off before energy is considered
    pub fn decide(energy_balance: &EnergyBalance, is_timeout: bool) -> Self {
        if is_timeout {
            return Self {
                activate: false,
                reason: BypassReason::Timeout,
            };
        }
        if energy_balance.sufficient {
            return Self {
                activate: false,
                reason: BypassReason::SufficientEnergy,
            };
        }
        Self {
            activate: true,
            reason: BypassReason::InsufficientEnergy,
        }
    }
}

/// Outcome of evaluating an EV energy change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EvDecision {
    /// Outside the request window; value kept for later
    Saved { value: f64 },
    /// Value set to zero inside the window
    Reset,
    /// Value acted on inside the window
    Processed {
        value: f64,
        bypass: BypassDecision,
        energy_balance: EnergyBalance,
        is_timeout: bool,
    },
}

impl EvDecision {
    pub fn result(&self) -> EvSetResult {
        match self {
            Self::Saved { .. } => EvSetResult::Saved,
            Self::Reset => EvSetResult::Reset,
            Self::Processed { .. } => EvSetResult::Processed,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "outside_charging_window",
            Self::Reset => "ev_set_to_zero",
            Self::Processed { .. } => "in_charging_window",
        }
    }

    /// The clamped EV energy carried by the decision
    pub fn value(&self) -> f64 {
        match self {
            Self::Saved { value } | Self::Processed { value, .. } => *value,
            Self::Reset => 0.0,
        }
    }

    pub fn bypass_should_activate(&self) -> bool {
        matches!(self, Self::Processed { bypass, .. } if bypass.activate)
    }

    pub fn bypass_reason(&self) -> Option<BypassReason> {
        match self {
            Self::Processed { bypass, .. } => Some(bypass.reason),
            _ => None,
        }
    }

    pub fn energy_balance(&self) -> Option<&EnergyBalance> {
        match self {
            Self::Processed { energy_balance, .. } => Some(energy_balance),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Processed { is_timeout: true, .. })
    }
}

/// Everything one evaluation looks at
#[derive(Debug, Clone, PartialEq)]
pub struct EvRequest {
    pub new_value: f64,
    pub old_value: f64,
    /// Local wall-clock time for the window check
    pub current_time: NaiveTime,
    /// Instant for the timeout check
    pub now: DateTime<Utc>,
    /// When the caller started the EV timer, if it is running
    pub timer_start: Option<DateTime<Utc>>,
    pub energy_balance: EnergyBalance,
}

/// Stateless EV decision function configured from [`Config::ev`]
#[derive(Debug, Clone)]
pub struct EvEvaluator {
    request_window: TimeWindow,
    timeout_hours: f64,
    max_energy_kwh: f64,
    bypass_margin: f64,
    logger: StructuredLogger,
}

impl EvEvaluator {
    pub fn new(config: &Config, logger: &StructuredLogger) -> Self {
        Self {
            request_window: config.ev.request_window,
            timeout_hours: config.ev.timeout_hours,
            max_energy_kwh: config.ev.max_energy_kwh,
            bypass_margin: config.ev.bypass_margin,
            logger: logger.for_component("ev"),
        }
    }

    pub fn timeout_hours(&self) -> f64 {
        self.timeout_hours
    }

    /// Margin callers should use when building the energy balance
    pub fn bypass_margin(&self) -> f64 {
        self.bypass_margin
    }

    /// Clamp a requested energy to `[0, max_energy_kwh]`; NaN becomes zero
    pub fn validate_value(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, self.max_energy_kwh)
    }

    pub fn is_in_request_window(&self, time: NaiveTime) -> bool {
        self.request_window.contains(time)
    }

    pub fn is_timeout_reached(&self, timer_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        timer_start.is_some() && elapsed_hours(timer_start, now) >= self.timeout_hours
    }

    /// Whole minutes left before the timeout; 0 with no timer or once expired
    pub fn remaining_timeout_minutes(
        &self,
        timer_start: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> i64 {
        let Some(start) = timer_start else {
            return 0;
        };
        let timeout_ms = (self.timeout_hours * 3_600_000.0) as i64;
        let remaining_ms = timeout_ms - (now - start).num_milliseconds();
        if remaining_ms <= 0 {
            return 0;
        }
        remaining_ms / 60_000
    }

    /// Evaluate an EV energy change
    pub fn evaluate(&self, request: &EvRequest) -> EvDecision {
        let value = self.validate_value(request.new_value);

        if !self.is_in_request_window(request.current_time) {
            self.logger.info(&format!(
                "EV request {:.2} -> {value:.2} kWh at {} outside window, saved",
                request.old_value,
                request.current_time.format("%H:%M")
            ));
            return EvDecision::Saved { value };
        }

        if value == 0.0 {
            self.logger
                .info(&format!("EV request reset (was {:.2} kWh)", request.old_value));
            return EvDecision::Reset;
        }

        let is_timeout = self.is_timeout_reached(request.timer_start, request.now);
        let bypass = BypassDecision::decide(&request.energy_balance, is_timeout);

        if is_timeout {
            self.logger.warn(&format!(
                "EV timeout reached after {:.2} h, bypass forced off",
                elapsed_hours(request.timer_start, request.now)
            ));
        }
        self.logger.info(&format!(
            "EV request {value:.2} kWh processed: bypass={} ({}), available {:.2} vs needed {:.2} kWh",
            bypass.activate,
            bypass.reason.as_str(),
            request.energy_balance.available,
            request.energy_balance.needed_with_margin,
        ));

        EvDecision::Processed {
            value,
            bypass,
            energy_balance: request.energy_balance,
            is_timeout,
        }
    }
}

/// Hours since the timer started; 0 with no timer
pub fn elapsed_hours(timer_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    timer_start.map_or(0.0, |start| {
        (now - start).num_milliseconds() as f64 / 3_600_000.0
    })
}
