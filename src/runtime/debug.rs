//! Debug logging for runtime execution
//!
//! The runtime logs through the `log` facade with one target per category.
//! `DebugLogger` is a small `log::Log` implementation for the binary and for
//! hosts that don't bring their own logger.

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const TARGET_ENGINE: &str = "meguri::engine";
pub const TARGET_FLOW: &str = "meguri::flow";
pub const TARGET_STATE: &str = "meguri::state";
pub const TARGET_INPUT: &str = "meguri::input";

/// Debug log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// All internal state changes
    Trace,
    /// Development debugging information
    Debug,
    /// Important state changes
    Info,
    /// Potential issues
    Warn,
    /// Error situations
    Error,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Debug log category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugCategory {
    /// Engine loop, faults
    Engine,
    /// Simulation passes, branches, jumps
    Flow,
    /// Snapshot restores
    State,
    /// Waits and player input
    Input,
}

impl DebugCategory {
    pub fn target(self) -> &'static str {
        match self {
            DebugCategory::Engine => TARGET_ENGINE,
            DebugCategory::Flow => TARGET_FLOW,
            DebugCategory::State => TARGET_STATE,
            DebugCategory::Input => TARGET_INPUT,
        }
    }

    fn from_target(target: &str) -> Option<Self> {
        match target {
            TARGET_ENGINE => Some(DebugCategory::Engine),
            TARGET_FLOW => Some(DebugCategory::Flow),
            TARGET_STATE => Some(DebugCategory::State),
            TARGET_INPUT => Some(DebugCategory::Input),
            _ => None,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Enable debug logging
    pub enabled: bool,
    /// Minimum log level
    pub level: LogLevel,
    /// Enabled categories
    pub categories: HashSet<DebugCategory>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        let mut categories = HashSet::new();
        categories.insert(DebugCategory::Engine);
        categories.insert(DebugCategory::Flow);

        Self {
            enabled: std::env::var("MEGURI_DEBUG").is_ok(),
            level: LogLevel::Debug,
            categories,
        }
    }
}

impl DebugConfig {
    /// Whether a record for `target` at `level` passes this config.
    ///
    /// Warnings and errors are always let through, even from foreign targets
    /// or disabled categories.
    pub fn allows(&self, target: &str, level: Level) -> bool {
        if level <= Level::Warn {
            return true;
        }
        if !self.enabled || level > self.level.filter() {
            return false;
        }
        match DebugCategory::from_target(target) {
            Some(category) => self.categories.contains(&category),
            None => false,
        }
    }
}

/// Writes `[LEVEL] category message` lines to stderr
pub struct DebugLogger {
    config: DebugConfig,
}

impl DebugLogger {
    pub fn new(config: DebugConfig) -> Self {
        Self { config }
    }

    /// Install as the global logger. Fails if one is already installed.
    pub fn install(config: DebugConfig) -> Result<(), log::SetLoggerError> {
        let max = if config.enabled {
            config.level.filter()
        } else {
            LevelFilter::Warn
        };
        log::set_boxed_logger(Box::new(Self::new(config)))?;
        log::set_max_level(max);
        Ok(())
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.config.allows(metadata.target(), metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let category = DebugCategory::from_target(record.target())
            .map(|c| format!("{:?}", c))
            .unwrap_or_else(|| record.target().to_string());
        eprintln!("[{}] {:10} {}", record.level(), category, record.args());
    }

    fn flush(&self) {}
}
