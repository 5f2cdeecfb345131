//! Runtime for narrative events
//!
//! [`Engine::builder`] wires the simulator, history ledger, playback executor
//! and wait coordinator together. The caller keeps the engine; input handlers
//! get the coordinator, renderers subscribe to frames.

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::EngineConfig;
use crate::error::{EngineError, SceneError, WaitError};
use crate::storage::SaveGame;
use crate::types::{Event, EventRef, GameState, LocationCatalog, LocationId, StaticCatalog};

pub mod coordinator;
pub mod custom;
pub mod debug;
pub mod executor;
pub mod history;
pub mod lifecycle;
pub mod simulator;

#[cfg(test)]
mod tests;

use coordinator::{Resolution, WaitCoordinator, WaitKind, WorldAction};
use custom::{CustomActionDispatcher, NoCustomActions};
use debug::TARGET_ENGINE;
use executor::{Executor, Frame, LiveState, PlaybackEnd};
use history::Ledger;
use lifecycle::EventRegistry;
use simulator::Simulator;

/// Result of one idle-loop iteration
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// An event was played to completion
    Played(EventRef),
    /// Nothing is ready to fire here
    Idle,
}

pub struct EngineBuilder {
    config: EngineConfig,
    catalog: Arc<dyn LocationCatalog>,
    dispatcher: Arc<dyn CustomActionDispatcher>,
    registry: EventRegistry,
    game: GameState,
}

impl EngineBuilder {
    pub fn catalog(mut self, catalog: impl LocationCatalog + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn dispatcher(mut self, dispatcher: impl CustomActionDispatcher + 'static) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn event(mut self, location: impl Into<LocationId>, event: Event) -> Self {
        self.registry.register(location.into(), event);
        self
    }

    pub fn game(mut self, game: GameState) -> Self {
        self.game = game;
        self
    }

    pub fn build(self) -> Engine {
        let coordinator = Arc::new(WaitCoordinator::new());
        let simulator = Simulator::new(self.config.language.clone())
            .surface_dead_ends(self.config.debug)
            .mute_after_first(self.config.mute_dead_ends_after_first);
        let ledger = Ledger::new(self.config.history_capacity);
        let live = LiveState {
            game: self.game,
            engine: Default::default(),
        };
        let executor = Executor::new(simulator, ledger, coordinator.clone(), self.dispatcher, live)
            .with_tail_len(self.config.save_history_tail);

        Engine {
            config: self.config,
            executor,
            coordinator,
            registry: self.registry,
            catalog: self.catalog,
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    executor: Executor,
    coordinator: Arc<WaitCoordinator>,
    registry: EventRegistry,
    catalog: Arc<dyn LocationCatalog>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            catalog: Arc::new(StaticCatalog::new()),
            dispatcher: Arc::new(NoCustomActions),
            registry: EventRegistry::new(),
            game: GameState::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Input side: resolve waits, navigate back, toggle skip
    pub fn coordinator(&self) -> Arc<WaitCoordinator> {
        self.coordinator.clone()
    }

    /// Render side: every change to live state
    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.executor.subscribe()
    }

    pub fn live(&self) -> &LiveState {
        self.executor.live()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Dead ends collected for the content author
    pub fn take_author_reports(&mut self) -> Vec<SceneError> {
        self.executor.simulator_mut().take_reports()
    }

    /// Play a registered event by name, regardless of its lifecycle
    pub async fn play(&mut self, name: &str) -> Result<PlaybackEnd, EngineError> {
        let event = self
            .registry
            .find(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownEvent(name.to_string()))?;
        let end = self.executor.play(&event).await?;
        self.registry.refresh_all(&self.executor.live().game);
        Ok(end)
    }

    /// One idle-loop iteration at the player's current location
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        let game = self.executor.live().game.clone();
        let Some(location_id) = game.location.clone() else {
            return Ok(TickOutcome::Idle);
        };
        let location = self
            .catalog
            .find_by_id(&location_id)
            .ok_or_else(|| EngineError::UnknownLocation(location_id.clone()))?;
        self.executor.set_background(location.background_at(game.hour));

        self.registry.refresh(&location_id, &game);
        let Some(event) = self.registry.next_ready(&location_id, &game).cloned() else {
            return Ok(TickOutcome::Idle);
        };
        self.executor.play(&event).await?;
        self.registry.refresh(&location_id, &self.executor.live().game);
        Ok(TickOutcome::Played(event.root_ref()))
    }

    /// Idle loop: play what is ready, otherwise wait for a world action.
    ///
    /// Faults are logged and followed by a pause; returns once the player
    /// quits or faults keep coming.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        let mut faults = 0u32;
        loop {
            match self.tick().await {
                Ok(TickOutcome::Played(event)) => {
                    faults = 0;
                    log::debug!(target: TARGET_ENGINE, "[Loop] played {}", event);
                }
                Ok(TickOutcome::Idle) => {
                    faults = 0;
                    match self.next_world_action().await? {
                        WorldAction::Quit => {
                            log::info!(target: TARGET_ENGINE, "[Loop] quit");
                            return Ok(());
                        }
                        action => self.executor.apply_world_action(&action),
                    }
                }
                Err(err) => {
                    faults += 1;
                    log::error!(target: TARGET_ENGINE, "[Fault] {} ({} in a row)", err, faults);
                    if faults >= self.config.max_consecutive_faults {
                        return Err(EngineError::TooManyFaults(faults));
                    }
                    tokio::time::sleep(self.config.fault_pause()).await;
                }
            }
        }
    }

    async fn next_world_action(&self) -> Result<WorldAction, EngineError> {
        loop {
            let pending = self.coordinator.wait(WaitKind::WorldAction)?;
            match pending.recv().await {
                Ok(Resolution::WorldAction(action)) => return Ok(action),
                Ok(_) => return Err(WaitError::WrongKind.into()),
                Err(WaitError::Cancelled) => {
                    // back navigation has nothing to act on while idle
                    self.coordinator.take_navigation();
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Capture the current frame as a save game
    pub fn save(&self) -> SaveGame {
        SaveGame::from_frame(&self.executor.frame())
    }

    /// Restore a save game. An event in progress is replayed silently up to
    /// the saved step and then resumed.
    pub async fn load(&mut self, save: SaveGame) -> Result<Option<PlaybackEnd>, EngineError> {
        let Some(name) = save.current_event.clone() else {
            self.executor.replace_live(save.live());
            return Ok(None);
        };
        let event = self
            .registry
            .find(&name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownEvent(name.clone()))?;

        // replay starts from the state the event started with
        self.executor.replace_live(save.start_state());
        if let Err(err) = self.executor.fast_forward(&event, save.current_step, &save.branch_trail) {
            log::warn!(target: TARGET_ENGINE, "[Load] replay of {} failed: {}", name, err);
            self.executor.replace_live(save.live());
            return Err(err);
        }
        if self.executor.live() != &save.live() {
            log::warn!(target: TARGET_ENGINE, "[Load] replayed state of {} differs from save", name);
        }
        let end = self.executor.resume(&event).await?;
        self.registry.refresh_all(&self.executor.live().game);
        Ok(Some(end))
    }
}
