//! Location catalog contract
//!
//! The catalog itself lives outside the engine. The idle loop asks it for the
//! player's current location once per tick to pick a background.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A place the player can be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub background: String,
    pub timed_backgrounds: Vec<TimedBackground>,
}

/// Background override for an hour range `[from_hour, to_hour)`
///
/// When `from_hour > to_hour` the range wraps past midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedBackground {
    pub from_hour: u8,
    pub to_hour: u8,
    pub background: String,
}

impl TimedBackground {
    pub fn applies_at(&self, hour: u8) -> bool {
        if self.from_hour <= self.to_hour {
            hour >= self.from_hour && hour < self.to_hour
        } else {
            hour >= self.from_hour || hour < self.to_hour
        }
    }
}

impl Location {
    pub fn new(id: impl Into<LocationId>, background: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            background: background.into(),
            timed_backgrounds: Vec::new(),
        }
    }

    pub fn with_timed_background(mut self, from_hour: u8, to_hour: u8, background: impl Into<String>) -> Self {
        self.timed_backgrounds.push(TimedBackground {
            from_hour,
            to_hour,
            background: background.into(),
        });
        self
    }

    /// First matching timed rule wins, otherwise the default background
    pub fn background_at(&self, hour: u8) -> &str {
        self.timed_backgrounds
            .iter()
            .find(|rule| rule.applies_at(hour))
            .map(|rule| rule.background.as_str())
            .unwrap_or(&self.background)
    }
}

/// Lookup of locations by id
pub trait LocationCatalog: Send + Sync {
    fn find_by_id(&self, id: &LocationId) -> Option<Location>;
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    locations: HashMap<LocationId, Location>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: Location) -> Self {
        self.locations.insert(location.id.clone(), location);
        self
    }
}

impl LocationCatalog for StaticCatalog {
    fn find_by_id(&self, id: &LocationId) -> Option<Location> {
        self.locations.get(id).cloned()
    }
}
