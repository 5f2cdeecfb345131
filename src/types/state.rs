//! Game and engine state
//!
//! `GameState` is persistent player/world data. `EngineState` is transient
//! presentation data. Both form a closed schema: every field is plain data, so
//! `Clone` is a full structural copy and snapshots never share anything with
//! the live state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::event::BranchId;
use super::location::LocationId;

/// Persistent player and world data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GameState {
    /// Story flags
    pub flags: HashMap<String, serde_json::Value>,
    /// Numeric player stats
    pub stats: BTreeMap<String, i64>,
    /// Current location
    pub location: Option<LocationId>,
    /// Hour of the in-game day, 0..24
    pub hour: u8,
    /// Elapsed in-game days
    pub day: u32,
    /// NPC relationship data, keyed by NPC id
    pub relationships: BTreeMap<String, Relationship>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, name: &str) -> Option<&serde_json::Value> {
        self.flags.get(name)
    }

    /// True when the flag exists and is not `false`, `null` or `0`
    pub fn is_set(&self, name: &str) -> bool {
        match self.flags.get(name) {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
            Some(serde_json::Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(_) => true,
        }
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.flags.insert(name.into(), value.into());
    }

    pub fn stat(&self, name: &str) -> i64 {
        self.stats.get(name).copied().unwrap_or(0)
    }

    /// Add `delta` to a stat, creating it at zero if absent. Returns the new value.
    pub fn add_stat(&mut self, name: impl Into<String>, delta: i64) -> i64 {
        let entry = self.stats.entry(name.into()).or_insert(0);
        *entry = entry.saturating_add(delta);
        *entry
    }

    pub fn relationship_mut(&mut self, npc: impl Into<String>) -> &mut Relationship {
        self.relationships.entry(npc.into()).or_default()
    }

    /// Advance the clock, rolling over into new days
    pub fn pass_hours(&mut self, hours: u32) {
        let total = u64::from(self.hour) + u64::from(hours);
        let days = u32::try_from(total / 24).unwrap_or(u32::MAX);
        self.day = self.day.saturating_add(days);
        self.hour = (total % 24) as u8;
    }
}

/// Relationship data between the player and one NPC
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Relationship {
    pub affinity: i32,
    pub met: bool,
    pub notes: Vec<String>,
}

/// Transient presentation state consumed by the render layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineState {
    /// Current background image
    pub background: Option<String>,
    /// Foreground layer stack, bottom first
    pub foreground: Vec<String>,
    /// Active dialogue line
    pub dialogue: Option<Dialogue>,
    /// Active choice set
    pub choices: Option<Vec<Choice>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A resolved dialogue line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dialogue {
    pub speaker: Option<String>,
    pub text: String,
}

/// A resolved choice as shown to the player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub text: String,
    pub branch: BranchId,
}

/// Displayable text, either plain or keyed by language code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Text {
    /// Build a localized text from `(language, text)` pairs
    pub fn localized<I, L, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, S)>,
        L: Into<String>,
        S: Into<String>,
    {
        Text::Localized(
            entries
                .into_iter()
                .map(|(lang, text)| (lang.into(), text.into()))
                .collect(),
        )
    }

    /// Resolve against `language` with no fallback.
    ///
    /// A missing translation renders a visible marker so authors notice it.
    pub fn resolve(&self, language: &str) -> String {
        match self {
            Text::Plain(text) => text.clone(),
            Text::Localized(map) => match map.get(language) {
                Some(text) => text.clone(),
                None => {
                    let hint = map.values().next().map(String::as_str).unwrap_or("");
                    format!("(MISSING TRANSLATION {language}: {hint})")
                }
            },
        }
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text::Plain(value.to_string())
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text::Plain(value)
    }
}

/// A choice as authored in a script
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub text: Text,
    pub branch: BranchId,
}

impl ChoiceOption {
    pub fn new(text: impl Into<Text>, branch: impl Into<BranchId>) -> Self {
        Self {
            text: text.into(),
            branch: branch.into(),
        }
    }
}
