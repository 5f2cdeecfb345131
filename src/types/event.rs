//! Authored events
//!
//! An event is data plus behavior: predicates deciding when it may fire and a
//! script that drives a [`Scene`]. Branches are nested scripts addressed by
//! [`BranchId`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::state::GameState;
use crate::error::SceneError;
use crate::runtime::simulator::Scene;

/// Script body run once per simulation pass
pub type Script = Arc<dyn Fn(&mut Scene) -> Result<(), SceneError> + Send + Sync>;

/// Predicate over game state
pub type Predicate = Arc<dyn Fn(&GameState) -> bool + Send + Sync>;

/// Name of a branch inside an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchId(String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BranchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which event, and which branch of it, produced an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRef {
    pub event: String,
    pub branch: Option<BranchId>,
}

impl EventRef {
    pub fn root(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            branch: None,
        }
    }

    pub fn branch(event: impl Into<String>, branch: BranchId) -> Self {
        Self {
            event: event.into(),
            branch: Some(branch),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}/{}", self.event, branch),
            None => f.write_str(&self.event),
        }
    }
}

/// A nested continuation of an event
#[derive(Clone)]
pub struct Branch {
    pub execute: Script,
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch").finish_non_exhaustive()
    }
}

/// An authored narrative event
#[derive(Clone)]
pub struct Event {
    pub name: String,
    pub id: Option<String>,
    pub conditions: Predicate,
    pub unlocked: Predicate,
    pub locked: Predicate,
    pub execute: Script,
    pub branches: HashMap<BranchId, Branch>,
}

impl Event {
    /// Create an event that is always unlocked, never locked and may always fire
    pub fn new<F>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn(&mut Scene) -> Result<(), SceneError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            id: None,
            conditions: Arc::new(|_| true),
            unlocked: Arc::new(|_| true),
            locked: Arc::new(|_| false),
            execute: Arc::new(execute),
            branches: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn conditions<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&GameState) -> bool + Send + Sync + 'static,
    {
        self.conditions = Arc::new(predicate);
        self
    }

    pub fn unlocked_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&GameState) -> bool + Send + Sync + 'static,
    {
        self.unlocked = Arc::new(predicate);
        self
    }

    pub fn locked_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&GameState) -> bool + Send + Sync + 'static,
    {
        self.locked = Arc::new(predicate);
        self
    }

    pub fn branch<F>(mut self, id: impl Into<BranchId>, execute: F) -> Self
    where
        F: Fn(&mut Scene) -> Result<(), SceneError> + Send + Sync + 'static,
    {
        self.branches.insert(
            id.into(),
            Branch {
                execute: Arc::new(execute),
            },
        );
        self
    }

    pub fn find_branch(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.get(id)
    }

    /// Explicit id, or the MD5 of the name when none was given
    pub fn stable_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{:x}", md5::compute(self.name.as_bytes())),
        }
    }

    pub fn root_ref(&self) -> EventRef {
        EventRef::root(self.name.clone())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut branches: Vec<_> = self.branches.keys().collect();
        branches.sort();
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("branches", &branches)
            .finish_non_exhaustive()
    }
}
