//! Storage module for saving and loading games
//!
//! Save games are JSON. `save`/`load` work on bytes; `write_slot`/`read_slot`
//! put them in numbered files under a directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::executor::{Frame, LiveState};
use crate::types::{Action, BranchId, EngineState, GameState};

pub const SAVE_VERSION: u32 = 1;

/// Everything needed to put a player back where they were
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveGame {
    pub version: u32,
    pub game: GameState,
    pub engine: EngineState,
    /// Event in progress, by name
    pub current_event: Option<String>,
    /// Ledger position inside the current event
    pub current_step: usize,
    /// Branches chosen on the way to `current_step`
    pub branch_trail: Vec<BranchId>,
    /// Live state when the current event started
    pub event_start: Option<LiveState>,
    /// Most recent past actions, oldest first
    pub history_tail: Vec<Action>,
}

impl SaveGame {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            version: SAVE_VERSION,
            game: frame.state.game.clone(),
            engine: frame.state.engine.clone(),
            current_event: frame.event.clone(),
            current_step: frame.step,
            branch_trail: frame.branch_trail.clone(),
            event_start: frame.run_start.clone(),
            history_tail: frame.history_tail.clone(),
        }
    }

    pub fn live(&self) -> LiveState {
        LiveState {
            game: self.game.clone(),
            engine: self.engine.clone(),
        }
    }

    /// State to replay the current event from
    pub fn start_state(&self) -> LiveState {
        self.event_start.clone().unwrap_or_else(|| self.live())
    }
}

/// Save game to bytes using JSON serialization
pub fn save(game: &SaveGame) -> anyhow::Result<Vec<u8>> {
    let json = serde_json::to_string_pretty(game)?;
    Ok(json.into_bytes())
}

/// Load game from bytes using JSON deserialization
pub fn load(bytes: &[u8]) -> anyhow::Result<SaveGame> {
    let json = std::str::from_utf8(bytes)?;
    let game: SaveGame = serde_json::from_str(json)?;
    if game.version != SAVE_VERSION {
        anyhow::bail!("unsupported save version {} (expected {})", game.version, SAVE_VERSION);
    }
    Ok(game)
}

pub fn slot_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("slot_{slot:02}.json"))
}

pub async fn write_slot(dir: &Path, slot: u8, game: &SaveGame) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = slot_path(dir, slot);
    tokio::fs::write(&path, save(game)?).await?;
    log::info!("Saved slot {} to {}", slot, path.display());
    Ok(path)
}

pub async fn read_slot(dir: &Path, slot: u8) -> anyhow::Result<Option<SaveGame>> {
    let path = slot_path(dir, slot);
    match tokio::fs::read(&path).await {
        Ok(bytes) => load(&bytes).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
