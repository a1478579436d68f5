use super::*;

/// EV charge timeout applied when none is configured
pub const DEFAULT_EV_TIMEOUT_HOURS: f64 = 6.0;

/// Hedge applied to needed energy before the bypass comparison
pub const DEFAULT_BYPASS_MARGIN: f64 = 1.15;

/// Upper bound for a requested EV energy value
pub const DEFAULT_EV_MAX_ENERGY_KWH: f64 = 200.0;

fn window(start_hour: u32, end_hour: u32) -> TimeWindow {
    TimeWindow {
        start: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN),
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            min_soc_reserve_percent: 15.0,
            safety_spread_percent: 10.0,
            minimum_consumption_fallback_kwh: 10.0,
            full_soc_threshold_percent: 99.0,
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        window(0, 7)
    }
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            request_window: TimeWindow::default(),
            timeout_hours: DEFAULT_EV_TIMEOUT_HOURS,
            max_energy_kwh: DEFAULT_EV_MAX_ENERGY_KWH,
            bypass_margin: DEFAULT_BYPASS_MARGIN,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_days: 21,
            max_reading_gap_hours: 1.0,
            max_power_w: 100_000.0,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_peak: 0.25,
            price_offpeak: 0.12,
            price_f1: 0.25,
            price_f2: 0.20,
            price_f3: 0.12,
            pricing_mode: PricingMode::TwoTier,
        }
    }
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self { history_days: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            battery: BatteryConfig::default(),
            charging_window: TimeWindow::default(),
            ev: EvConfig::default(),
            forecast: ForecastConfig::default(),
            pricing: PricingConfig::default(),
            savings: SavingsConfig::default(),
            logging: LoggingConfig::default(),
            timezone: "UTC".to_string(),
        }
    }
}
