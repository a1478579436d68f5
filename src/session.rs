//! Night charge session tracking
//!
//! A session spans one overnight charge of the home battery, from the
//! moment charging is enabled until the target SOC is reached or the window
//! closes. The energy it put into the battery feeds the savings accountant.

use crate::config::Config;
use crate::error::{NightChargerError, Result};
use crate::logging::StructuredLogger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of completed sessions kept in memory
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Night charge session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSession {
    /// Unique session ID
    pub id: String,

    pub start_time: DateTime<Utc>,

    /// End time of the session (if finished)
    pub end_time: Option<DateTime<Utc>>,

    /// Battery SOC when charging was enabled
    pub start_soc_percent: f64,

    /// Battery SOC when charging stopped
    pub end_soc_percent: Option<f64>,

    /// Energy put into the battery, from the SOC delta
    pub charged_kwh: f64,

    pub status: SessionStatus,
}

/// Session status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Charging in progress
    Active,

    /// Stopped at target or full
    Completed,

    /// Stopped early, typically at window close
    Interrupted,
}

/// Persisted session manager state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub current_session: Option<ChargeSession>,
    pub last_session: Option<ChargeSession>,
    pub history: Vec<ChargeSession>,
}

/// Tracks the active night charge and a bounded history of finished ones
#[derive(Debug)]
pub struct ChargeSessionManager {
    /// Current active session
    pub current_session: Option<ChargeSession>,

    /// Last finished session
    pub last_session: Option<ChargeSession>,

    session_history: Vec<ChargeSession>,
    max_history_size: usize,
    capacity_kwh: f64,
    full_soc_threshold_percent: f64,
    logger: StructuredLogger,
}

impl ChargeSessionManager {
    pub fn new(config: &Config, logger: &StructuredLogger) -> Self {
        Self::with_history_size(config, logger, DEFAULT_MAX_HISTORY)
    }

    pub fn with_history_size(
        config: &Config,
        logger: &StructuredLogger,
        max_history_size: usize,
    ) -> Self {
        Self {
            current_session: None,
            last_session: None,
            session_history: Vec::with_capacity(max_history_size),
            max_history_size,
            capacity_kwh: config.battery.capacity_kwh,
            full_soc_threshold_percent: config.battery.full_soc_threshold_percent,
            logger: logger.for_component("session"),
        }
    }

    /// Start a new night charge
    pub fn start_session(&mut self, start_soc_percent: f64, now: DateTime<Utc>) -> Result<&ChargeSession> {
        if self.current_session.is_some() {
            return Err(NightChargerError::session("Session already active"));
        }

        let session = ChargeSession {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: now,
            end_time: None,
            start_soc_percent,
            end_soc_percent: None,
            charged_kwh: 0.0,
            status: SessionStatus::Active,
        };

        self.logger.with_session_id(&session.id).info(&format!(
            "Started night charge at {start_soc_percent:.1}% SOC"
        ));
        Ok(&*self.current_session.insert(session))
    }

    /// True once the battery hits the planned target or counts as full
    pub fn target_reached(&self, current_soc_percent: f64, target_soc_percent: f64) -> bool {
        current_soc_percent >= target_soc_percent
            || current_soc_percent >= self.full_soc_threshold_percent
    }

    /// End the active session normally
    pub fn end_session(&mut self, end_soc_percent: f64, now: DateTime<Utc>) -> Result<ChargeSession> {
        self.finish(end_soc_percent, now, SessionStatus::Completed)
    }

    /// End the active session early; the energy charged so far still counts
    pub fn interrupt_session(&mut self, end_soc_percent: f64, now: DateTime<Utc>) -> Result<ChargeSession> {
        self.finish(end_soc_percent, now, SessionStatus::Interrupted)
    }

    fn finish(
        &mut self,
        end_soc_percent: f64,
        now: DateTime<Utc>,
        status: SessionStatus,
    ) -> Result<ChargeSession> {
        let Some(mut session) = self.current_session.take() else {
            return Err(NightChargerError::session("No active session to end"));
        };

        session.end_time = Some(now);
        session.end_soc_percent = Some(end_soc_percent);
        session.charged_kwh =
            ((end_soc_percent - session.start_soc_percent).max(0.0) / 100.0) * self.capacity_kwh;
        session.status = status;

        self.logger.with_session_id(&session.id).info(&format!(
            "Night charge {:?}: {:.1}% -> {end_soc_percent:.1}%, charged {:.3} kWh",
            status, session.start_soc_percent, session.charged_kwh
        ));

        self.last_session = Some(session.clone());
        self.session_history.push(session.clone());
        if self.session_history.len() > self.max_history_size {
            self.session_history.remove(0);
        }

        Ok(session)
    }

    pub fn history(&self) -> &[ChargeSession] {
        &self.session_history
    }

    /// Get session state for persistence
    pub fn get_state(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_session: self.current_session.clone(),
            last_session: self.last_session.clone(),
            history: self.session_history.clone(),
        }
    }

    /// Restore session state, keeping only the newest `max_history_size`
    /// finished sessions
    pub fn restore_state(&mut self, snapshot: SessionSnapshot) {
        self.current_session = snapshot.current_session;
        self.last_session = snapshot.last_session;
        self.session_history = snapshot.history;
        if self.session_history.len() > self.max_history_size {
            let excess = self.session_history.len() - self.max_history_size;
            self.session_history.drain(..excess);
        }
        if let Some(ref session) = self.current_session {
            self.logger
                .with_session_id(&session.id)
                .info("Restored active night charge");
        }
    }

    /// Get session statistics
    pub fn session_stats(&self, now: DateTime<Utc>) -> serde_json::Value {
        let mut stats = serde_json::Map::new();

        if let Some(ref session) = self.current_session {
            stats.insert("session_active".to_string(), true.into());
            stats.insert("session_id".to_string(), session.id.clone().into());
            stats.insert(
                "session_duration_min".to_string(),
                (now - session.start_time).num_minutes().max(0).into(),
            );
            stats.insert(
                "start_soc_percent".to_string(),
                session.start_soc_percent.into(),
            );
        } else {
            stats.insert("session_active".to_string(), false.into());
            stats.insert("session_duration_min".to_string(), serde_json::Value::Null);
        }

        stats.insert(
            "last_charged_kwh".to_string(),
            self.last_session
                .as_ref()
                .map_or(serde_json::Value::Null, |s| s.charged_kwh.into()),
        );
        stats.insert(
            "sessions_recorded".to_string(),
            self.session_history.len().into(),
        );
        stats.insert(
            "total_charged_kwh".to_string(),
            self.session_history
                .iter()
                .map(|s| s.charged_kwh)
                .sum::<f64>()
                .into(),
        );

        serde_json::Value::Object(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::get_logger;
    use chrono::{Duration, TimeZone};

    fn manager(history: usize) -> ChargeSessionManager {
        ChargeSessionManager::with_history_size(&Config::default(), &get_logger("test"), history)
    }

    #[test]
    fn history_is_bounded() {
        let mut mgr = manager(2);
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        for i in 0..3 {
            let start = t0 + Duration::days(i);
            mgr.start_session(20.0, start).unwrap();
            mgr.end_session(60.0, start + Duration::hours(3)).unwrap();
        }
        assert_eq!(mgr.history().len(), 2);
        assert_eq!(mgr.history()[0].start_time, t0 + Duration::days(1));
    }

    #[test]
    fn soc_drop_charges_nothing() {
        let mut mgr = manager(5);
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        mgr.start_session(50.0, t0).unwrap();
        let session = mgr.interrupt_session(45.0, t0 + Duration::hours(7)).unwrap();
        assert_eq!(session.charged_kwh, 0.0);
        assert_eq!(session.status, SessionStatus::Interrupted);
    }

    #[test]
    fn target_or_full_threshold() {
        let mgr = manager(5);
        assert!(mgr.target_reached(71.5, 71.5));
        assert!(!mgr.target_reached(70.0, 100.0));
        assert!(mgr.target_reached(99.0, 100.0));
    }
}
