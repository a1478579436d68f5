//! Configuration management for Night Charger
//!
//! One immutable, fully typed [`Config`] is resolved at startup (from YAML or
//! defaults) and passed explicitly into every engine component. Nothing in
//! the engine re-derives defaults on its own.

use crate::error::{NightChargerError, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

pub use defaults::{DEFAULT_BYPASS_MARGIN, DEFAULT_EV_MAX_ENERGY_KWH, DEFAULT_EV_TIMEOUT_HOURS};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Battery and planning parameters
    pub battery: BatteryConfig,

    /// Period during which overnight grid charging may occur
    pub charging_window: TimeWindow,

    /// EV request handling
    pub ev: EvConfig,

    /// Consumption learning parameters
    pub forecast: ForecastConfig,

    /// Tariff configuration for savings accounting
    pub pricing: PricingConfig,

    /// Savings history retention
    pub savings: SavingsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// IANA timezone used to derive local window times and day boundaries
    pub timezone: String,
}

/// Battery and planner tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Usable battery capacity
    pub capacity_kwh: f64,

    /// Minimum SOC the planner never plans below
    pub min_soc_reserve_percent: f64,

    /// Buffer added on top of the computed target
    pub safety_spread_percent: f64,

    /// Floor applied to learned consumption forecasts
    pub minimum_consumption_fallback_kwh: f64,

    /// SOC at which a running charge is considered complete regardless of target
    pub full_soc_threshold_percent: f64,
}

/// A wall-clock interval `[start, end)`. When `start > end` the window wraps
/// past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start, `HH:MM`
    #[serde(with = "hhmm")]
    pub start: NaiveTime,

    /// Exclusive end, `HH:MM`
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Build a window from two `HH:MM` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
        })
    }

    /// Whether `time` falls inside the half-open window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Whether the window spans midnight
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }
}

/// EV request handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvConfig {
    /// Period during which EV energy requests are acted upon. Kept separate
    /// from `charging_window` even though both default to the same hours.
    pub request_window: TimeWindow,

    /// Maximum time the bypass may stay engaged for one request
    pub timeout_hours: f64,

    /// Upper clamp for requested EV energy
    pub max_energy_kwh: f64,

    /// Multiplicative hedge on needed energy for the bypass decision
    pub bypass_margin: f64,
}

/// Consumption learning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of daily records retained
    pub history_days: usize,

    /// Readings further apart than this are not integrated
    pub max_reading_gap_hours: f64,

    /// Upper clamp for a single power reading
    pub max_power_w: f64,
}

/// Tariff structure selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Single peak and off-peak rate
    #[default]
    TwoTier,
    /// F1 (peak), F2 (mid) and F3 (off-peak) bands
    ThreeTier,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoTier => "two_tier",
            Self::ThreeTier => "three_tier",
        }
    }
}

/// Tariff configuration, rates in EUR/kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub price_peak: f64,
    pub price_offpeak: f64,
    pub price_f1: f64,
    pub price_f2: f64,
    pub price_f3: f64,
    pub pricing_mode: PricingMode,
}

/// Savings history retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsConfig {
    /// Session records older than this many days (relative to the newest
    /// record) are dropped
    pub history_days: i64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory or file path for rotated log files; no file output when unset
    pub file: Option<String>,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Parse an `HH:MM` (or `HH:MM:SS`) wall-clock time
pub fn parse_hhmm(raw: &str) -> std::result::Result<NaiveTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hhmm(&raw).map_err(D::Error::custom)
    }
}

fn check_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(NightChargerError::validation(
            field,
            "Must be between 0 and 100",
        ));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(NightChargerError::validation(field, "Must be positive"));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(NightChargerError::validation(field, "Must not be negative"));
    }
    Ok(())
}

fn check_window(field: &str, window: &TimeWindow) -> Result<()> {
    if window.start == window.end {
        return Err(NightChargerError::validation(
            field,
            "Window start and end must differ",
        ));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "night_charger.yaml",
            "/data/night_charger.yaml",
            "/etc/night-charger/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Resolve the configured timezone
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            NightChargerError::validation("timezone", format!("Unknown timezone: {}", self.timezone))
        })
    }

    /// Convert a UTC instant to local wall-clock time in the configured zone
    pub fn local_datetime(&self, utc: DateTime<Utc>) -> Result<NaiveDateTime> {
        let tz = self.timezone()?;
        Ok(utc.with_timezone(&tz).naive_local())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let battery = &self.battery;
        check_positive("battery.capacity_kwh", battery.capacity_kwh)?;
        check_percent(
            "battery.min_soc_reserve_percent",
            battery.min_soc_reserve_percent,
        )?;
        check_percent(
            "battery.full_soc_threshold_percent",
            battery.full_soc_threshold_percent,
        )?;
        check_non_negative(
            "battery.safety_spread_percent",
            battery.safety_spread_percent,
        )?;
        check_non_negative(
            "battery.minimum_consumption_fallback_kwh",
            battery.minimum_consumption_fallback_kwh,
        )?;

        check_window("charging_window", &self.charging_window)?;
        check_window("ev.request_window", &self.ev.request_window)?;

        check_positive("ev.timeout_hours", self.ev.timeout_hours)?;
        check_positive("ev.max_energy_kwh", self.ev.max_energy_kwh)?;
        if !self.ev.bypass_margin.is_finite() || self.ev.bypass_margin < 1.0 {
            return Err(NightChargerError::validation(
                "ev.bypass_margin",
                "Must be at least 1.0",
            ));
        }

        if self.forecast.history_days == 0 {
            return Err(NightChargerError::validation(
                "forecast.history_days",
                "Must be greater than 0",
            ));
        }
        check_positive(
            "forecast.max_reading_gap_hours",
            self.forecast.max_reading_gap_hours,
        )?;
        check_positive("forecast.max_power_w", self.forecast.max_power_w)?;

        let p = &self.pricing;
        for (field, rate) in [
            ("pricing.price_peak", p.price_peak),
            ("pricing.price_offpeak", p.price_offpeak),
            ("pricing.price_f1", p.price_f1),
            ("pricing.price_f2", p.price_f2),
            ("pricing.price_f3", p.price_f3),
        ] {
            check_non_negative(field, rate)?;
        }

        if self.savings.history_days <= 0 {
            return Err(NightChargerError::validation(
                "savings.history_days",
                "Must be greater than 0",
            ));
        }

        crate::logging::level::parse_log_level(&self.logging.level)?;
        self.timezone()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.battery.capacity_kwh - 10.0).abs() < f64::EPSILON);
        assert!((config.ev.bypass_margin - 1.15).abs() < f64::EPSILON);
        assert_eq!(config.forecast.history_days, 21);
        assert_eq!(config.pricing.pricing_mode, PricingMode::TwoTier);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.battery.capacity_kwh = 0.0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.battery.min_soc_reserve_percent = 120.0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.ev.request_window.end = config.ev.request_window.start;
        assert!(config.validate().is_err());

        config = Config::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_contains_half_open() {
        let window = TimeWindow::parse("00:00", "07:00").unwrap();
        assert!(window.contains(NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(6, 59, 59).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(7, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(22, 0, 0).unwrap()));
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let window = TimeWindow::parse("23:59", "07:00").unwrap();
        assert!(window.wraps_midnight());
        assert!(window.contains(NaiveTime::from_hms_opt(23, 59, 30).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "battery:\n  capacity_kwh: 13.5\npricing:\n  pricing_mode: three_tier\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!((config.battery.capacity_kwh - 13.5).abs() < f64::EPSILON);
        assert!((config.battery.min_soc_reserve_percent - 15.0).abs() < f64::EPSILON);
        assert_eq!(config.pricing.pricing_mode, PricingMode::ThreeTier);
    }

    #[test]
    fn test_local_datetime_uses_timezone() {
        let config = Config {
            timezone: "Europe/Rome".to_string(),
            ..Default::default()
        };
        let utc = DateTime::parse_from_rfc3339("2025-01-15T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let local = config.local_datetime(utc).unwrap();
        assert_eq!(local.to_string(), "2025-01-16 00:30:00");
    }
}
