//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::runtime::debug::DebugConfig;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Surface authored dead ends to the content author instead of only logging them
    pub debug: bool,
    /// Report only the first dead end per session
    pub mute_dead_ends_after_first: bool,
    /// Maximum number of past actions kept by the history ledger
    pub history_capacity: usize,
    /// Number of past actions copied into a save game
    pub save_history_tail: usize,
    /// Pause after an engine fault before the idle loop resumes
    pub fault_pause_ms: u64,
    /// Consecutive faults after which `Engine::run` gives up
    pub max_consecutive_faults: u32,
    /// Language used to resolve localized text
    pub language: String,
    /// Log filtering
    pub debug_log: DebugConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: cfg!(debug_assertions),
            mute_dead_ends_after_first: false,
            history_capacity: 10_000,
            save_history_tail: 20,
            fault_pause_ms: 1_000,
            max_consecutive_faults: 5,
            language: "en".to_string(),
            debug_log: DebugConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn fault_pause(&self) -> Duration {
        Duration::from_millis(self.fault_pause_ms)
    }
}
