//! Event lifecycle cache
//!
//! Events are grouped by location and classified `NotReady -> Unlocked ->
//! Locked`. Classification only moves forward.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::runtime::debug::TARGET_ENGINE;
use crate::types::{Event, GameState, LocationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lifecycle {
    NotReady,
    Unlocked,
    Locked,
}

#[derive(Debug, Clone)]
struct Entry {
    event: Event,
    lifecycle: Lifecycle,
}

/// Events of every location with their classification
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    locations: BTreeMap<LocationId, Vec<Entry>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, location: LocationId, event: Event) {
        self.locations.entry(location).or_default().push(Entry {
            event,
            lifecycle: Lifecycle::NotReady,
        });
    }

    pub fn find(&self, name: &str) -> Option<&Event> {
        self.locations
            .values()
            .flatten()
            .map(|entry| &entry.event)
            .find(|event| event.name == name)
    }

    pub fn lifecycle(&self, name: &str) -> Option<Lifecycle> {
        self.locations
            .values()
            .flatten()
            .find(|entry| entry.event.name == name)
            .map(|entry| entry.lifecycle)
    }

    /// Re-classify the events of `location` against `game`
    pub fn refresh(&mut self, location: &LocationId, game: &GameState) {
        let Some(entries) = self.locations.get_mut(location) else {
            return;
        };
        for entry in entries {
            let next = classify(entry.lifecycle, &entry.event, game);
            if next != entry.lifecycle {
                log::debug!(
                    target: TARGET_ENGINE,
                    "[Lifecycle] {} {:?} -> {:?}",
                    entry.event.name,
                    entry.lifecycle,
                    next
                );
                entry.lifecycle = next;
            }
        }
    }

    /// Re-classify every location
    pub fn refresh_all(&mut self, game: &GameState) {
        let locations: Vec<_> = self.locations.keys().cloned().collect();
        for location in locations {
            self.refresh(&location, game);
        }
    }

    /// First unlocked event at `location` whose conditions hold
    pub fn next_ready(&self, location: &LocationId, game: &GameState) -> Option<&Event> {
        self.locations
            .get(location)?
            .iter()
            .find(|entry| entry.lifecycle == Lifecycle::Unlocked && (entry.event.conditions)(game))
            .map(|entry| &entry.event)
    }
}

fn classify(current: Lifecycle, event: &Event, game: &GameState) -> Lifecycle {
    match current {
        Lifecycle::Locked => Lifecycle::Locked,
        _ if (event.locked)(game) => Lifecycle::Locked,
        Lifecycle::Unlocked => Lifecycle::Unlocked,
        Lifecycle::NotReady if (event.unlocked)(game) => Lifecycle::Unlocked,
        Lifecycle::NotReady => Lifecycle::NotReady,
    }
}
