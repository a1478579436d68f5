//! Snapshot of the state that must survive restarts
//!
//! The engine never touches storage itself. Hosts take a snapshot after
//! mutating calls, write the JSON wherever they keep state, and hand it back
//! on startup. Missing sections load as empty defaults.

use crate::error::Result;
use crate::ev::EvSession;
use crate::forecaster::ForecasterData;
use crate::savings::SavingsData;
use crate::session::SessionSnapshot;
use serde::{Deserialize, Deserializer, Serialize};

/// Persistent state structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    /// Consumption history, `{"history": [...]}`
    pub consumption: ForecasterData,

    /// Savings accumulators with pricing fields
    pub savings: SavingsData,

    /// Caller-held EV request and timer
    pub ev: EvSession,

    /// Active and recent night charge sessions
    pub session: SessionSnapshot,
}

impl PersistentState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}

/// Deserialize a history list, dropping entries that do not parse
pub(crate) fn skip_invalid_entries<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry<T> {
        Valid(T),
        Invalid(serde::de::IgnoredAny),
    }

    let entries = Vec::<Entry<T>>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Valid(value) => Some(value),
            Entry::Invalid(_) => None,
        })
        .collect())
}
