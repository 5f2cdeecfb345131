//! Recorded actions
//!
//! An `Action` is one step of narrative progress together with full snapshots
//! of game and engine state taken right after its side effect was applied.
//! Replaying an action needs nothing but the action itself.

use serde::{Deserialize, Serialize};

use super::event::{BranchId, EventRef};
use super::state::{EngineState, GameState};

/// What an action asks playback to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Show the dialogue line in the snapshot and wait for continue
    ShowText,
    /// Show the choice set in the snapshot and wait for a selection
    ShowChoices,
    /// Enter a branch without asking the player
    Jump { branch: BranchId },
    /// Hand off to the custom action dispatcher
    RunCustom {
        id: String,
        args: serde_json::Value,
    },
}

impl ActionKind {
    /// Whether this kind ends a simulation pass
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionKind::ShowText)
    }

    /// Whether playback rests on this kind waiting for the player
    pub fn is_interactive(&self) -> bool {
        matches!(self, ActionKind::ShowText | ActionKind::ShowChoices)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::ShowText => "show_text",
            ActionKind::ShowChoices => "show_choices",
            ActionKind::Jump { .. } => "jump",
            ActionKind::RunCustom { .. } => "run_custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub source: EventRef,
    pub game_snapshot: GameState,
    pub engine_snapshot: EngineState,
}

impl Action {
    pub fn new(kind: ActionKind, source: EventRef, game: &GameState, engine: &EngineState) -> Self {
        Self {
            kind,
            source,
            game_snapshot: game.clone(),
            engine_snapshot: engine.clone(),
        }
    }
}
