use anyhow::{Context, Result};
use chrono::Utc;
use night_charger::config::Config;
use night_charger::forecaster::ConsumptionForecaster;
use night_charger::logging::{get_logger, init_logging};
use night_charger::{ChargePlanner, PersistentState, PlanningInput};
use serde::Deserialize;
use std::io::Read;
use tracing::info;

/// One planning request read from stdin
#[derive(Debug, Deserialize)]
struct PlanRequest {
    soc_percent: f64,
    solar_forecast_kwh: f64,
    /// Falls back to the learned weekday forecast when absent
    #[serde(default)]
    consumption_forecast_kwh: Option<f64>,
    #[serde(default)]
    ev_energy_kwh: f64,
    #[serde(default)]
    force_charge: bool,
    #[serde(default)]
    disable_charge: bool,
    #[serde(default)]
    is_preview: bool,
    #[serde(default)]
    state: Option<PersistentState>,
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => Config::load().context("Failed to load config")?,
    };
    config.validate().context("Invalid configuration")?;
    init_logging(&config.logging)?;
    info!("Night Charger {} planning", env!("APP_VERSION"));

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read plan request from stdin")?;
    let request: PlanRequest =
        serde_json::from_str(&raw).context("Invalid plan request JSON")?;

    let logger = get_logger("night_charger");
    let consumption = match request.consumption_forecast_kwh {
        Some(kwh) => kwh,
        None => {
            let state = request.state.unwrap_or_default();
            let forecaster =
                ConsumptionForecaster::from_data(state.consumption, &config.forecast, &logger);
            let today = config.local_datetime(Utc::now())?.date();
            forecaster.get_consumption_forecast(
                request.is_preview,
                today,
                config.battery.minimum_consumption_fallback_kwh,
            )
        }
    };

    let input = PlanningInput::new(
        &config.battery,
        request.soc_percent,
        consumption,
        request.solar_forecast_kwh,
    )
    .with_ev_energy(request.ev_energy_kwh)
    .with_force_charge(request.force_charge)
    .with_disable_charge(request.disable_charge)
    .as_preview(request.is_preview);
    input.validate()?;

    let planner = ChargePlanner::new(&config, &logger);
    let result = planner.calculate(&input);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
