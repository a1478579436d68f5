//! Household consumption learning and weekday forecasting
//!
//! Power samples are integrated into a running daily total. At each local
//! day boundary the host calls [`ConsumptionForecaster::close_day`], which
//! files the total into a rolling history of daily records. Forecasts are
//! the mean of past days sharing the target weekday, floored at a fallback.
//!
//! The forecaster is not reentrant: mutating calls on one instance must be
//! serialized by the caller.

use crate::config::ForecastConfig;
use crate::logging::StructuredLogger;
use crate::persistence::skip_invalid_entries;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

pub const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// One closed day of consumption. Weekday 0 is Monday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredConsumptionRecord")]
pub struct ConsumptionRecord {
    pub date: NaiveDate,
    pub weekday: u8,
    pub consumption_kwh: f64,
}

/// Record as found on disk; only the date is mandatory
#[derive(Deserialize)]
struct StoredConsumptionRecord {
    date: NaiveDate,
    weekday: Option<u8>,
    #[serde(default)]
    consumption_kwh: f64,
}

impl From<StoredConsumptionRecord> for ConsumptionRecord {
    fn from(stored: StoredConsumptionRecord) -> Self {
        Self {
            date: stored.date,
            weekday: stored
                .weekday
                .filter(|&w| w < 7)
                .unwrap_or_else(|| weekday_index(stored.date)),
            consumption_kwh: stored.consumption_kwh,
        }
    }
}

/// Persisted forecaster shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterData {
    #[serde(deserialize_with = "skip_invalid_entries")]
    pub history: Vec<ConsumptionRecord>,
}

#[derive(Debug, Clone, Copy)]
struct PowerReading {
    at: DateTime<Utc>,
    watts: f64,
}

#[derive(Debug, Clone)]
pub struct ConsumptionForecaster {
    history: Vec<ConsumptionRecord>,
    history_days: usize,
    max_gap_hours: f64,
    max_power_w: f64,
    current_day_kwh: f64,
    last_reading: Option<PowerReading>,
    weekday_cache: OnceCell<[f64; 7]>,
    logger: StructuredLogger,
}

impl ConsumptionForecaster {
    pub fn new(config: &ForecastConfig, logger: &StructuredLogger) -> Self {
        Self {
            history: Vec::new(),
            history_days: config.history_days,
            max_gap_hours: config.max_reading_gap_hours,
            max_power_w: config.max_power_w,
            current_day_kwh: 0.0,
            last_reading: None,
            weekday_cache: OnceCell::new(),
            logger: logger.for_component("forecaster"),
        }
    }

    /// Restore from persisted data, sorting and pruning oversize histories
    pub fn from_data(data: ForecasterData, config: &ForecastConfig, logger: &StructuredLogger) -> Self {
        let mut forecaster = Self::new(config, logger);
        forecaster.history = data.history;
        forecaster.sort_and_prune();
        forecaster
            .logger
            .debug(&format!("Loaded {} consumption records", forecaster.history.len()));
        forecaster
    }

    pub fn to_data(&self) -> ForecasterData {
        ForecasterData {
            history: self.history.clone(),
        }
    }

    /// Integrate one power sample and return the running daily total in kWh.
    ///
    /// Non-finite samples are ignored. A gap that is non-positive or longer
    /// than the configured limit only re-anchors the last reading.
    pub fn add_power_reading(&mut self, power_watts: f64, at: DateTime<Utc>) -> f64 {
        if !power_watts.is_finite() {
            return self.current_day_kwh;
        }
        let watts = power_watts.clamp(0.0, self.max_power_w);
        let reading = PowerReading { at, watts };

        let Some(last) = self.last_reading.replace(reading) else {
            return self.current_day_kwh;
        };

        let elapsed_hours = (at - last.at).num_milliseconds() as f64 / 3_600_000.0;
        if elapsed_hours <= 0.0 || elapsed_hours > self.max_gap_hours {
            self.logger.debug(&format!(
                "Skipping integration over {elapsed_hours:.3} h gap"
            ));
            return self.current_day_kwh;
        }

        self.current_day_kwh += (last.watts + watts) / 2.0 * elapsed_hours / 1000.0;
        self.current_day_kwh
    }

    /// File the accumulated total as yesterday's record relative to `now`
    pub fn close_day(&mut self, now: NaiveDateTime) -> ConsumptionRecord {
        let today = now.date();
        let yesterday = today.pred_opt().unwrap_or(today);
        let record = ConsumptionRecord {
            date: yesterday,
            weekday: weekday_index(yesterday),
            consumption_kwh: self.current_day_kwh,
        };

        self.history.push(record.clone());
        self.sort_and_prune();
        self.reset_current_day();

        self.logger.info(&format!(
            "Closed {} ({}) with {:.2} kWh, {} records kept",
            record.date,
            WEEKDAY_NAMES[usize::from(record.weekday)],
            record.consumption_kwh,
            self.history.len()
        ));
        record
    }

    /// Mean consumption for a weekday (0 = Monday), 0.0 without samples
    pub fn get_weekday_average(&self, weekday: u8) -> f64 {
        self.averages()
            .get(usize::from(weekday))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn weekday_averages(&self) -> [(&'static str, f64); 7] {
        let averages = self.averages();
        std::array::from_fn(|i| (WEEKDAY_NAMES[i], averages[i]))
    }

    /// Forecast for today or tomorrow, never below `minimum_fallback`
    pub fn get_consumption_forecast(
        &self,
        for_tomorrow: bool,
        today: NaiveDate,
        minimum_fallback: f64,
    ) -> f64 {
        let target = if for_tomorrow {
            today.succ_opt().unwrap_or(today)
        } else {
            today
        };
        self.get_weekday_average(weekday_index(target))
            .max(minimum_fallback)
    }

    pub fn delete_record(&mut self, date: NaiveDate) -> bool {
        let before = self.history.len();
        self.history.retain(|r| r.date != date);
        let deleted = self.history.len() != before;
        if deleted {
            self.weekday_cache = OnceCell::new();
            self.logger.info(&format!("Deleted consumption record for {date}"));
        }
        deleted
    }

    pub fn reset_current_day(&mut self) {
        self.current_day_kwh = 0.0;
        self.last_reading = None;
    }

    pub fn current_day_consumption(&self) -> f64 {
        self.current_day_kwh
    }

    pub fn history(&self) -> &[ConsumptionRecord] {
        &self.history
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    fn averages(&self) -> &[f64; 7] {
        self.weekday_cache.get_or_init(|| {
            let mut sums = [0.0_f64; 7];
            let mut counts = [0_u32; 7];
            for record in &self.history {
                let i = usize::from(record.weekday);
                if i < 7 {
                    sums[i] += record.consumption_kwh;
                    counts[i] += 1;
                }
            }
            std::array::from_fn(|i| {
                if counts[i] == 0 {
                    0.0
                } else {
                    sums[i] / f64::from(counts[i])
                }
            })
        })
    }

    fn sort_and_prune(&mut self) {
        self.history.sort_by_key(|r| r.date);
        if self.history.len() > self.history_days {
            let excess = self.history.len() - self.history_days;
            self.history.drain(..excess);
        }
        self.weekday_cache = OnceCell::new();
    }
}

fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_monday is always < 7
    date.weekday().num_days_from_monday() as u8
}
