//! Core types for the meguri library
//!
//! - State: persistent game data and transient engine (presentation) data
//! - Action: one recorded, replayable step with its snapshots
//! - Event: authored content, predicates and branch scripts
//! - Location: the catalog contract used by the idle loop

pub mod action;
pub mod event;
pub mod location;
pub mod state;

pub use action::{Action, ActionKind};
pub use event::{Branch, BranchId, Event, EventRef, Predicate, Script};
pub use location::{Location, LocationCatalog, LocationId, StaticCatalog, TimedBackground};
pub use state::{Choice, ChoiceOption, Dialogue, EngineState, GameState, Relationship, Text};
