//! Nightly charge planning
//!
//! Computes how much grid energy the battery should take overnight so that
//! stored energy plus tomorrow's solar production covers the forecast load,
//! never planning below the configured reserve. The planner performs no I/O
//! and never fails: callers supply sane values (see
//! [`PlanningInput::validate`]).

use crate::config::{BatteryConfig, Config, TimeWindow};
use crate::error::{NightChargerError, Result};
use crate::logging::StructuredLogger;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Values a single planning run works from. Recreated for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningInput {
    pub current_soc_percent: f64,
    pub battery_capacity_kwh: f64,
    pub min_soc_reserve_percent: f64,
    pub safety_spread_percent: f64,
    pub consumption_forecast_kwh: f64,
    pub solar_forecast_kwh: f64,
    /// Additional load announced by an EV, zero when none
    pub ev_energy_kwh: f64,
    pub force_charge: bool,
    pub disable_charge: bool,
    /// True when planning for tomorrow rather than the current day
    pub is_preview: bool,
}

impl PlanningInput {
    /// Start an input from the battery configuration and live readings
    pub fn new(
        battery: &BatteryConfig,
        current_soc_percent: f64,
        consumption_forecast_kwh: f64,
        solar_forecast_kwh: f64,
    ) -> Self {
        Self {
            current_soc_percent,
            battery_capacity_kwh: battery.capacity_kwh,
            min_soc_reserve_percent: battery.min_soc_reserve_percent,
            safety_spread_percent: battery.safety_spread_percent,
            consumption_forecast_kwh,
            solar_forecast_kwh,
            ev_energy_kwh: 0.0,
            force_charge: false,
            disable_charge: false,
            is_preview: false,
        }
    }

    pub fn with_ev_energy(mut self, ev_energy_kwh: f64) -> Self {
        self.ev_energy_kwh = ev_energy_kwh;
        self
    }

    pub fn with_force_charge(mut self, force: bool) -> Self {
        self.force_charge = force;
        self
    }

    pub fn with_disable_charge(mut self, disable: bool) -> Self {
        self.disable_charge = disable;
        self
    }

    pub fn as_preview(mut self, is_preview: bool) -> Self {
        self.is_preview = is_preview;
        self
    }

    /// Check the preconditions `ChargePlanner::calculate` relies on but does
    /// not enforce itself.
    pub fn validate(&self) -> Result<()> {
        if !self.battery_capacity_kwh.is_finite() || self.battery_capacity_kwh <= 0.0 {
            return Err(NightChargerError::validation(
                "battery_capacity_kwh",
                "Must be positive",
            ));
        }
        if self.force_charge && self.disable_charge {
            return Err(NightChargerError::validation(
                "force_charge",
                "force_charge and disable_charge are mutually exclusive",
            ));
        }
        Ok(())
    }

    /// Energy balance for the bypass decision, using the battery's current
    /// stored energy.
    pub fn energy_balance(&self, margin: f64) -> EnergyBalance {
        EnergyBalance::new(
            self.current_soc_percent / 100.0 * self.battery_capacity_kwh,
            self.solar_forecast_kwh,
            self.consumption_forecast_kwh,
            self.ev_energy_kwh,
            margin,
        )
    }
}

/// Which manual override shaped a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    None,
    Forced,
    Disabled,
}

/// Outcome of a planning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningResult {
    pub target_soc_percent: f64,
    pub planned_charge_kwh: f64,
    pub is_charging_scheduled: bool,
    pub reasoning: String,
    pub load_forecast_kwh: f64,
    pub solar_forecast_kwh: f64,
    pub current_energy_kwh: f64,
    pub target_energy_kwh: f64,
    pub reserve_energy_kwh: f64,
    /// Total load minus solar; negative on a solar surplus
    pub net_load_on_battery_kwh: f64,
    pub override_kind: OverrideKind,
}

/// Available versus needed energy, hedged by a margin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBalance {
    pub battery_kwh: f64,
    pub solar_kwh: f64,
    pub consumption_kwh: f64,
    pub ev_kwh: f64,
    pub available: f64,
    pub needed: f64,
    pub needed_with_margin: f64,
    pub sufficient: bool,
    pub deficit: f64,
    pub surplus: f64,
}

impl EnergyBalance {
    pub fn new(
        battery_kwh: f64,
        solar_kwh: f64,
        consumption_kwh: f64,
        ev_kwh: f64,
        margin: f64,
    ) -> Self {
        let available = battery_kwh + solar_kwh;
        let needed = consumption_kwh + ev_kwh;
        let needed_with_margin = needed * margin;

        Self {
            battery_kwh,
            solar_kwh,
            consumption_kwh,
            ev_kwh,
            available,
            needed,
            needed_with_margin,
            sufficient: available >= needed_with_margin,
            deficit: (needed_with_margin - available).max(0.0),
            surplus: (available - needed_with_margin).max(0.0),
        }
    }
}

/// Stateless nightly planner
#[derive(Debug, Clone)]
pub struct ChargePlanner {
    charging_window: TimeWindow,
    logger: StructuredLogger,
}

impl ChargePlanner {
    pub fn new(config: &Config, logger: &StructuredLogger) -> Self {
        Self {
            charging_window: config.charging_window,
            logger: logger.for_component("planner"),
        }
    }

    /// Whether overnight grid charging may run at `time`
    pub fn is_in_charging_window(&self, time: NaiveTime) -> bool {
        self.charging_window.contains(time)
    }

    /// Compute the target SOC and grid energy for the coming day.
    ///
    /// `disable_charge` wins over `force_charge` when both are set; callers
    /// are expected to reject that combination via [`PlanningInput::validate`].
    pub fn calculate(&self, input: &PlanningInput) -> PlanningResult {
        let capacity = input.battery_capacity_kwh;
        let current_energy = input.current_soc_percent / 100.0 * capacity;
        let reserve_energy = input.min_soc_reserve_percent / 100.0 * capacity;

        let total_load = input.consumption_forecast_kwh + input.ev_energy_kwh;
        let net_load_on_battery = total_load - input.solar_forecast_kwh;

        let base_target = reserve_energy + net_load_on_battery.max(0.0);
        let target_with_safety = base_target * (1.0 + input.safety_spread_percent / 100.0);

        // max/min rather than clamp: a reserve above 100 must not panic
        let mut target_soc_percent = (target_with_safety / capacity * 100.0)
            .max(input.min_soc_reserve_percent)
            .min(100.0);
        let mut target_energy = target_soc_percent / 100.0 * capacity;
        let needed_kwh = (target_energy - current_energy).max(0.0);

        let mut planned_charge_kwh = needed_kwh;
        let mut is_charging_scheduled = needed_kwh > 0.0;
        let mut override_kind = OverrideKind::None;

        if input.force_charge && input.disable_charge {
            self.logger
                .warn("Both force and disable overrides set; disable takes precedence");
        }

        if input.disable_charge {
            planned_charge_kwh = 0.0;
            is_charging_scheduled = false;
            override_kind = OverrideKind::Disabled;
        } else if input.force_charge {
            target_soc_percent = 100.0;
            target_energy = capacity;
            planned_charge_kwh = (target_energy - current_energy).max(0.0);
            is_charging_scheduled = true;
            override_kind = OverrideKind::Forced;
        }

        let reasoning = build_reasoning(
            input,
            override_kind,
            planned_charge_kwh,
            target_soc_percent,
        );

        self.logger.info(&format!(
            "Plan: target {target_soc_percent:.1}% ({target_energy:.2} kWh), charge {planned_charge_kwh:.2} kWh, scheduled={is_charging_scheduled}"
        ));
        self.logger.debug(&format!(
            "Plan inputs: soc={:.1}% load={:.2} ev={:.2} solar={:.2} net={net_load_on_battery:.2}",
            input.current_soc_percent,
            input.consumption_forecast_kwh,
            input.ev_energy_kwh,
            input.solar_forecast_kwh,
        ));

        PlanningResult {
            target_soc_percent,
            planned_charge_kwh,
            is_charging_scheduled,
            reasoning,
            load_forecast_kwh: input.consumption_forecast_kwh,
            solar_forecast_kwh: input.solar_forecast_kwh,
            current_energy_kwh: current_energy,
            target_energy_kwh: target_energy,
            reserve_energy_kwh: reserve_energy,
            net_load_on_battery_kwh: net_load_on_battery,
            override_kind,
        }
    }

    /// Energy balance used by the EV bypass decision. `margin` is the EV
    /// hedge (1.15 by default), independent of the planner's safety spread.
    pub fn calculate_energy_balance(
        battery_kwh: f64,
        solar_kwh: f64,
        consumption_kwh: f64,
        ev_kwh: f64,
        margin: f64,
    ) -> EnergyBalance {
        EnergyBalance::new(battery_kwh, solar_kwh, consumption_kwh, ev_kwh, margin)
    }
}

fn build_reasoning(
    input: &PlanningInput,
    override_kind: OverrideKind,
    planned_charge_kwh: f64,
    target_soc_percent: f64,
) -> String {
    let prefix = match override_kind {
        OverrideKind::Disabled => "[DISABLED BY USER] ",
        OverrideKind::Forced => "[FORCED BY USER] ",
        OverrideKind::None => "",
    };
    let day = if input.is_preview {
        "Tomorrow's"
    } else {
        "Today's"
    };

    let mut reasoning = format!(
        "{prefix}Planned {planned_charge_kwh:.2} kWh grid charge. {day} estimated load is {:.2} kWh",
        input.consumption_forecast_kwh
    );
    if input.ev_energy_kwh > 0.0 {
        reasoning.push_str(&format!(" + {:.2} kWh EV", input.ev_energy_kwh));
    }
    reasoning.push_str(&format!(
        ", with {:.2} kWh solar forecast. Target SOC: {target_soc_percent:.1}%.",
        input.solar_forecast_kwh
    ));
    reasoning
}
