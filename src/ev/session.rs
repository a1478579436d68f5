use super::{EvDecision, elapsed_hours};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Implicit EV charging state, derived from the caller-held timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvChargeState {
    /// No timer running
    Idle,
    /// Timer running, bypass may be engaged
    Charging,
    /// Timer expired; bypass stays off until reset or window close
    OverTimeout,
}

/// EV state the host keeps between evaluations and persists across restarts.
///
/// Not synchronized: all mutating calls must be serialized by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvSession {
    /// Last accepted EV energy requirement
    pub energy_kwh: f64,
    /// When the current request started; `None` when idle
    pub timer_start: Option<DateTime<Utc>>,
    /// Last commanded bypass state
    pub bypass_active: bool,
}

impl EvSession {
    pub fn is_timer_active(&self) -> bool {
        self.timer_start.is_some()
    }

    pub fn is_set(&self) -> bool {
        self.energy_kwh > 0.0
    }

    /// Apply an evaluator decision: the timer starts on the first processed
    /// non-zero request and is cleared on reset.
    pub fn apply(&mut self, decision: &EvDecision, now: DateTime<Utc>) {
        match decision {
            EvDecision::Saved { value } => {
                self.energy_kwh = *value;
                self.bypass_active = false;
            }
            EvDecision::Reset => self.reset(),
            EvDecision::Processed { value, bypass, .. } => {
                self.energy_kwh = *value;
                if *value > 0.0 && self.timer_start.is_none() {
                    self.timer_start = Some(now);
                }
                self.bypass_active = bypass.activate;
            }
        }
    }

    /// Window closed: drop the request and timer
    pub fn close_window(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.energy_kwh = 0.0;
        self.timer_start = None;
        self.bypass_active = false;
    }

    pub fn state(&self, now: DateTime<Utc>, timeout_hours: f64) -> EvChargeState {
        match self.timer_start {
            None => EvChargeState::Idle,
            Some(_) if elapsed_hours(self.timer_start, now) >= timeout_hours => {
                EvChargeState::OverTimeout
            }
            Some(_) => EvChargeState::Charging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ev::{BypassDecision, BypassReason};
    use crate::planner::EnergyBalance;
    use chrono::{Duration, TimeZone};

    fn processed(value: f64, activate: bool) -> EvDecision {
        EvDecision::Processed {
            value,
            bypass: BypassDecision {
                activate,
                reason: if activate {
                    BypassReason::InsufficientEnergy
                } else {
                    BypassReason::SufficientEnergy
                },
            },
            energy_balance: EnergyBalance::new(5.0, 0.0, 5.0, value, 1.15),
            is_timeout: false,
        }
    }

    #[test]
    fn timer_starts_once_and_clears_on_reset() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap();
        let mut session = EvSession::default();
        assert_eq!(session.state(t0, 6.0), EvChargeState::Idle);

        session.apply(&processed(20.0, true), t0);
        assert_eq!(session.timer_start, Some(t0));
        assert!(session.bypass_active);

        // A later update keeps the first start
        session.apply(&processed(25.0, true), t0 + Duration::hours(1));
        assert_eq!(session.timer_start, Some(t0));
        assert_eq!(session.state(t0 + Duration::hours(1), 6.0), EvChargeState::Charging);
        assert_eq!(
            session.state(t0 + Duration::hours(6), 6.0),
            EvChargeState::OverTimeout
        );

        session.apply(&EvDecision::Reset, t0 + Duration::hours(7));
        assert_eq!(session, EvSession::default());
    }

    #[test]
    fn saved_value_does_not_start_timer() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 21, 0, 0).unwrap();
        let mut session = EvSession::default();
        session.apply(&EvDecision::Saved { value: 12.0 }, t0);
        assert!(session.is_set());
        assert!(!session.is_timer_active());

        session.close_window();
        assert!(!session.is_set());
    }
}
