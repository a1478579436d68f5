//! Savings accounting for night charging
//!
//! Each completed night charge is priced twice: at the night rate actually
//! paid and at the day rate that would have been paid buying the same
//! energy later. The difference accumulates into total, monthly and
//! lifetime counters plus a short rolling history.

use crate::config::{Config, PricingConfig, PricingMode};
use crate::logging::StructuredLogger;
use crate::persistence::skip_invalid_entries;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Daytime hours billed at F1 and F2 in three-tier mode
const F1_DAY_HOURS: f64 = 11.0;
const F2_DAY_HOURS: f64 = 5.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of one priced charge session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub charged_kwh: f64,
    #[serde(default)]
    pub offpeak_cost: f64,
    #[serde(default)]
    pub peak_cost: f64,
    #[serde(default)]
    pub savings: f64,
}

/// Accumulators and rolling history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsState {
    pub total_charged_kwh: f64,
    pub total_savings_eur: f64,
    pub total_cost_eur: f64,
    pub theoretical_cost_eur: f64,
    pub monthly_charged_kwh: f64,
    pub monthly_savings_eur: f64,
    /// `YYYY-MM` of the month the monthly counters belong to; empty before
    /// the first session
    pub current_month: String,
    pub lifetime_charged_kwh: f64,
    pub lifetime_savings_eur: f64,
    #[serde(deserialize_with = "skip_invalid_entries")]
    pub history: Vec<SavingsRecord>,
}

/// Persisted accountant shape: the accumulators with pricing fields inline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsData {
    #[serde(flatten)]
    pub state: SavingsState,
    #[serde(flatten)]
    pub pricing: PricingConfig,
}

/// Rounded snapshot for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub total_charged_kwh: f64,
    pub total_savings_eur: f64,
    pub total_cost_eur: f64,
    pub theoretical_cost_eur: f64,
    pub monthly_charged_kwh: f64,
    pub monthly_savings_eur: f64,
    pub lifetime_charged_kwh: f64,
    pub lifetime_savings_eur: f64,
    pub current_month: String,
    pub pricing_mode: PricingMode,
    pub night_rate: f64,
    pub day_rate: f64,
}

/// Not reentrant: serialize mutating calls per instance.
#[derive(Debug, Clone)]
pub struct SavingsAccountant {
    pricing: PricingConfig,
    state: SavingsState,
    history_days: i64,
    logger: StructuredLogger,
}

impl SavingsAccountant {
    pub fn new(config: &Config, logger: &StructuredLogger) -> Self {
        Self {
            pricing: config.pricing.clone(),
            state: SavingsState::default(),
            history_days: config.savings.history_days,
            logger: logger.for_component("savings"),
        }
    }

    /// Restore persisted accumulators and the pricing they were kept with
    pub fn from_data(data: SavingsData, config: &Config, logger: &StructuredLogger) -> Self {
        let mut accountant = Self::new(config, logger);
        accountant.pricing = data.pricing;
        accountant.state = data.state;
        accountant.prune_history();
        accountant
    }

    pub fn to_data(&self) -> SavingsData {
        SavingsData {
            state: self.state.clone(),
            pricing: self.pricing.clone(),
        }
    }

    pub fn state(&self) -> &SavingsState {
        &self.state
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn update_prices(&mut self, pricing: PricingConfig) {
        self.logger.info(&format!(
            "Pricing updated: mode={}, night={:.4}, day={:.4}",
            pricing.pricing_mode.as_str(),
            Self::night_rate_for(&pricing),
            Self::day_rate_for(&pricing),
        ));
        self.pricing = pricing;
    }

    pub fn night_rate(&self) -> f64 {
        Self::night_rate_for(&self.pricing)
    }

    pub fn day_rate(&self) -> f64 {
        Self::day_rate_for(&self.pricing)
    }

    fn night_rate_for(pricing: &PricingConfig) -> f64 {
        match pricing.pricing_mode {
            PricingMode::TwoTier => pricing.price_offpeak,
            PricingMode::ThreeTier => pricing.price_f3,
        }
    }

    fn day_rate_for(pricing: &PricingConfig) -> f64 {
        match pricing.pricing_mode {
            PricingMode::TwoTier => pricing.price_peak,
            PricingMode::ThreeTier => {
                (F1_DAY_HOURS * pricing.price_f1 + F2_DAY_HOURS * pricing.price_f2)
                    / (F1_DAY_HOURS + F2_DAY_HOURS)
            }
        }
    }

    /// Price a completed night charge and fold it into the accumulators.
    ///
    /// Negative or non-finite energy counts as zero. A date from a month
    /// before `current_month` still counts toward totals and lifetime but
    /// leaves the monthly counters alone.
    pub fn record_charge_session(&mut self, charged_kwh: f64, date: NaiveDate) -> SavingsRecord {
        let charged_kwh = if charged_kwh.is_finite() {
            charged_kwh.max(0.0)
        } else {
            0.0
        };
        let night_rate = self.night_rate();
        let day_rate = self.day_rate();

        let offpeak_cost = charged_kwh * night_rate;
        let peak_cost = charged_kwh * day_rate;
        let record = SavingsRecord {
            date,
            charged_kwh,
            offpeak_cost: round2(offpeak_cost),
            peak_cost: round2(peak_cost),
            savings: round2(peak_cost - offpeak_cost),
        };

        let month = date.format("%Y-%m").to_string();
        let state = &mut self.state;
        let counts_monthly = if state.current_month.is_empty() || month > state.current_month {
            if !state.current_month.is_empty() {
                self.logger.info(&format!(
                    "Month rollover {} -> {month}, monthly counters reset",
                    state.current_month
                ));
            }
            state.monthly_charged_kwh = 0.0;
            state.monthly_savings_eur = 0.0;
            state.current_month = month;
            true
        } else if month == state.current_month {
            true
        } else {
            self.logger.warn(&format!(
                "Session dated {date} precedes current month {}, monthly counters untouched",
                state.current_month
            ));
            false
        };

        state.total_charged_kwh += record.charged_kwh;
        state.total_savings_eur += record.savings;
        state.total_cost_eur += record.offpeak_cost;
        state.theoretical_cost_eur += record.peak_cost;
        if counts_monthly {
            state.monthly_charged_kwh += record.charged_kwh;
            state.monthly_savings_eur += record.savings;
        }
        state.lifetime_charged_kwh += record.charged_kwh;
        state.lifetime_savings_eur += record.savings;

        state.history.push(record.clone());
        self.prune_history();

        self.logger.info(&format!(
            "Recorded {:.2} kWh on {date}: cost {:.2} vs {:.2} EUR, saved {:.2} EUR",
            record.charged_kwh, record.offpeak_cost, record.peak_cost, record.savings
        ));
        record
    }

    /// Keep records within `history_days` of the newest recorded date
    fn prune_history(&mut self) {
        let history = &mut self.state.history;
        history.sort_by_key(|r| r.date);
        let Some(newest) = history.last().map(|r| r.date) else {
            return;
        };
        let cutoff = newest - Duration::days(self.history_days);
        history.retain(|r| r.date >= cutoff);
    }

    pub fn last_30_days_savings(&self) -> f64 {
        round2(self.state.history.iter().map(|r| r.savings).sum())
    }

    /// Mean savings per distinct recorded day
    pub fn average_daily_savings(&self) -> f64 {
        let days: BTreeSet<NaiveDate> = self.state.history.iter().map(|r| r.date).collect();
        if days.is_empty() {
            return 0.0;
        }
        let total: f64 = self.state.history.iter().map(|r| r.savings).sum();
        round2(total / days.len() as f64)
    }

    pub fn get_savings_summary(&self) -> SavingsSummary {
        let s = &self.state;
        SavingsSummary {
            total_charged_kwh: round2(s.total_charged_kwh),
            total_savings_eur: round2(s.total_savings_eur),
            total_cost_eur: round2(s.total_cost_eur),
            theoretical_cost_eur: round2(s.theoretical_cost_eur),
            monthly_charged_kwh: round2(s.monthly_charged_kwh),
            monthly_savings_eur: round2(s.monthly_savings_eur),
            lifetime_charged_kwh: round2(s.lifetime_charged_kwh),
            lifetime_savings_eur: round2(s.lifetime_savings_eur),
            current_month: s.current_month.clone(),
            pricing_mode: self.pricing.pricing_mode,
            night_rate: self.night_rate(),
            day_rate: self.day_rate(),
        }
    }

    pub fn reset_monthly(&mut self) {
        self.state.monthly_charged_kwh = 0.0;
        self.state.monthly_savings_eur = 0.0;
    }

    pub fn reset_all(&mut self) {
        self.logger.warn("All savings statistics reset");
        self.state = SavingsState::default();
    }
}
