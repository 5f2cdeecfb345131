//! Playback executor
//!
//! Plays one event run: simulate, then walk the ledger restoring each
//! action's snapshots onto live state and performing the interaction its kind
//! asks for. Going back only moves the ledger and restores an older snapshot;
//! script code is never re-run for that.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{EngineError, WaitError};
use crate::runtime::coordinator::{Navigation, Resolution, WaitCoordinator, WaitKind, WorldAction};
use crate::runtime::custom::CustomActionDispatcher;
use crate::runtime::debug::{TARGET_FLOW, TARGET_STATE};
use crate::runtime::history::Ledger;
use crate::runtime::simulator::Simulator;
use crate::types::{Action, ActionKind, BranchId, EngineState, Event, EventRef, GameState};

/// Live game and engine state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveState {
    pub game: GameState,
    pub engine: EngineState,
}

/// What observers see after every change to live state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub state: LiveState,
    /// Event being played, if any
    pub event: Option<String>,
    /// Ledger position of the action on screen
    pub step: usize,
    /// Branches chosen on the way to `step`
    pub branch_trail: Vec<BranchId>,
    /// Most recent past actions, oldest first
    pub history_tail: Vec<Action>,
    /// Live state when the current event started
    pub run_start: Option<LiveState>,
}

/// How an event run ended
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEnd {
    pub event: String,
    pub actions_played: usize,
}

enum Flow {
    /// Action consumed; move the ledger forward
    Next,
    /// The ledger already moved (a branch was entered)
    Moved,
    /// Nothing left to play
    Finished,
    /// The player asked to go back
    Back,
    /// Wait again on the same action
    Stay,
}

pub struct Executor {
    simulator: Simulator,
    ledger: Ledger,
    coordinator: Arc<WaitCoordinator>,
    dispatcher: Arc<dyn CustomActionDispatcher>,
    live: LiveState,
    frames: watch::Sender<Frame>,
    current_event: Option<String>,
    /// (ledger step of the choice, branch chosen)
    branch_trail: Vec<(usize, BranchId)>,
    run_start: Option<LiveState>,
    /// Game state the newest pass finished with, applied once the ledger runs out
    pass_end: Option<GameState>,
    tail_len: usize,
    played: usize,
}

impl Executor {
    pub fn new(
        simulator: Simulator,
        ledger: Ledger,
        coordinator: Arc<WaitCoordinator>,
        dispatcher: Arc<dyn CustomActionDispatcher>,
        live: LiveState,
    ) -> Self {
        let (frames, _) = watch::channel(Frame {
            state: live.clone(),
            ..Frame::default()
        });
        Self {
            simulator,
            ledger,
            coordinator,
            dispatcher,
            live,
            frames,
            current_event: None,
            branch_trail: Vec::new(),
            run_start: None,
            pass_end: None,
            tail_len: 20,
            played: 0,
        }
    }

    /// Number of past actions included in published frames
    pub fn with_tail_len(mut self, tail_len: usize) -> Self {
        self.tail_len = tail_len;
        self
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    pub fn coordinator(&self) -> &Arc<WaitCoordinator> {
        &self.coordinator
    }

    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.frames.subscribe()
    }

    /// Latest published frame
    pub fn frame(&self) -> Frame {
        self.frames.borrow().clone()
    }

    /// Play `event` to completion. The ledger is reset afterwards, whether
    /// the run finished or faulted.
    pub async fn play(&mut self, event: &Event) -> Result<PlaybackEnd, EngineError> {
        log::info!(target: TARGET_FLOW, "[Play] {} ({})", event.name, event.stable_id());
        self.current_event = Some(event.name.clone());
        self.run_start = Some(self.live.clone());
        self.played = 0;

        let result = match self.begin(event) {
            Ok(()) => self.drive(event).await,
            Err(err) => Err(err),
        };
        self.finish();

        result.map(|played| PlaybackEnd {
            event: event.name.clone(),
            actions_played: played,
        })
    }

    /// Replay `event` up to ledger position `step` without publishing any of
    /// the intermediate states, taking the recorded branches at choices.
    pub fn fast_forward(&mut self, event: &Event, step: usize, trail: &[BranchId]) -> Result<(), EngineError> {
        self.current_event = Some(event.name.clone());
        self.run_start = Some(self.live.clone());
        self.played = 0;
        if let Err(err) = self.replay_silently(event, step, trail) {
            self.finish();
            return Err(err);
        }
        if let Some(action) = self.ledger.current().cloned() {
            self.restore(&action);
        }
        Ok(())
    }

    /// Continue a run prepared by `fast_forward`
    pub async fn resume(&mut self, event: &Event) -> Result<PlaybackEnd, EngineError> {
        if self.current_event.as_deref() != Some(event.name.as_str()) {
            return Err(EngineError::SaveMismatch(format!(
                "no run of '{}' to resume",
                event.name
            )));
        }
        let result = self.drive(event).await;
        self.finish();
        result.map(|played| PlaybackEnd {
            event: event.name.clone(),
            actions_played: played,
        })
    }

    /// Overwrite live state, outside of playback
    pub fn replace_live(&mut self, live: LiveState) {
        self.live = live;
        self.publish();
    }

    pub fn set_background(&mut self, background: &str) {
        if self.live.engine.background.as_deref() != Some(background) {
            self.live.engine.background = Some(background.to_string());
            self.publish();
        }
    }

    /// Apply an idle-time world action to live game state
    pub fn apply_world_action(&mut self, action: &WorldAction) {
        match action {
            WorldAction::Travel(location) => {
                self.live.game.location = Some(location.clone());
                self.live.engine.foreground.clear();
            }
            WorldAction::Rest { hours } => self.live.game.pass_hours(*hours),
            WorldAction::Quit => return,
        }
        self.publish();
    }

    fn begin(&mut self, event: &Event) -> Result<(), EngineError> {
        let pass = self
            .simulator
            .simulate_pass(&event.execute, event.root_ref(), &self.live.game, &self.live.engine)?;
        self.pass_end = Some(pass.final_game);
        self.ledger.set_future(pass.actions);
        self.ledger.advance();
        Ok(())
    }

    async fn drive(&mut self, event: &Event) -> Result<usize, EngineError> {
        while let Some(action) = self.ledger.current().cloned() {
            self.restore(&action);
            match self.interpret(event, &action).await? {
                Flow::Next => {
                    self.played += 1;
                    if !self.ledger.advance() {
                        break;
                    }
                }
                Flow::Moved => self.played += 1,
                Flow::Finished => {
                    self.played += 1;
                    break;
                }
                Flow::Back => self.step_back(),
                Flow::Stay => {}
            }
        }
        self.settle();
        Ok(self.played)
    }

    fn finish(&mut self) {
        self.ledger.reset();
        self.branch_trail.clear();
        self.current_event = None;
        self.run_start = None;
        self.pass_end = None;
        self.publish();
    }

    /// Mirror an action's snapshots into live state
    fn restore(&mut self, action: &Action) {
        log::trace!(
            target: TARGET_STATE,
            "[Restore] {} at step {} from {}",
            action.kind.name(),
            self.ledger.step(),
            action.source
        );
        self.mirror(action.game_snapshot.clone(), action.engine_snapshot.clone());
    }

    /// Carry game changes made after the last action of the finished pass
    fn settle(&mut self) {
        let Some(game) = self.pass_end.take() else {
            return;
        };
        if game != self.live.game {
            log::trace!(target: TARGET_STATE, "[Restore] end of pass at step {}", self.ledger.step());
            let engine = self.live.engine.clone();
            self.mirror(game, engine);
        }
    }

    fn mirror(&mut self, game: GameState, engine: EngineState) {
        self.live.game = game;
        self.live.engine = engine;
        self.publish();
    }

    fn publish(&self) {
        let frame = Frame {
            state: self.live.clone(),
            event: self.current_event.clone(),
            step: self.ledger.step(),
            branch_trail: self.branch_trail.iter().map(|(_, b)| b.clone()).collect(),
            history_tail: self.ledger.tail(self.tail_len),
            run_start: self.run_start.clone(),
        };
        self.frames.send_replace(frame);
    }

    async fn interpret(&mut self, event: &Event, action: &Action) -> Result<Flow, EngineError> {
        match &action.kind {
            ActionKind::ShowText => match self.wait_for(WaitKind::Continue).await? {
                Some(_) => Ok(Flow::Next),
                None => Ok(self.after_cancel()),
            },
            ActionKind::ShowChoices => {
                let Some(Resolution::Choice(index)) = self.wait_for(WaitKind::Choice).await? else {
                    return Ok(self.after_cancel());
                };
                let choices = action.engine_snapshot.choices.as_deref().unwrap_or_default();
                let Some(choice) = choices.get(index) else {
                    log::warn!(
                        target: TARGET_FLOW,
                        "[Choice] choice {} out of range (0..{})",
                        index,
                        choices.len()
                    );
                    return Ok(Flow::Stay);
                };
                let branch = choice.branch.clone();
                self.branch_trail.push((self.ledger.step(), branch.clone()));
                self.live.engine.choices = None;
                self.enter_branch(event, &branch)
            }
            ActionKind::Jump { branch } => self.enter_branch(event, branch),
            ActionKind::RunCustom { id, args } => {
                log::debug!(target: TARGET_FLOW, "[Custom] {} {}", id, args);
                let result = self
                    .dispatcher
                    .execute(id, args, &self.live.engine, &self.live.game)
                    .await?;
                log::debug!(target: TARGET_FLOW, "[Custom] {} finished: {}", id, result);
                Ok(Flow::Next)
            }
        }
    }

    /// `Ok(None)` means the wait was cancelled by navigation
    async fn wait_for(&self, kind: WaitKind) -> Result<Option<Resolution>, EngineError> {
        let pending = self.coordinator.wait(kind)?;
        match pending.recv().await {
            Ok(resolution) if resolution.kind() == kind => Ok(Some(resolution)),
            Ok(_) => Err(EngineError::Wait(WaitError::WrongKind)),
            Err(WaitError::Cancelled) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn after_cancel(&self) -> Flow {
        match self.coordinator.take_navigation() {
            Some(Navigation::Back) => Flow::Back,
            None => Flow::Stay,
        }
    }

    fn enter_branch(&mut self, event: &Event, id: &BranchId) -> Result<Flow, EngineError> {
        let branch = event
            .find_branch(id)
            .ok_or_else(|| EngineError::unknown_branch(event.name.clone(), id.clone()))?;
        log::debug!(target: TARGET_FLOW, "[Branch] {} -> {}", event.name, id);
        let pass = self.simulator.simulate_pass(
            &branch.execute,
            EventRef::branch(event.name.clone(), id.clone()),
            &self.live.game,
            &self.live.engine,
        )?;
        self.pass_end = Some(pass.final_game);
        self.ledger.set_future(pass.actions);
        if self.ledger.advance() {
            Ok(Flow::Moved)
        } else {
            Ok(Flow::Finished)
        }
    }

    /// Retreat to the previous action playback can rest on. If there is none,
    /// the ledger ends up where it started.
    fn step_back(&mut self) {
        let mut moved = 0;
        while self.ledger.retreat() {
            moved += 1;
            if self.ledger.current().is_some_and(|a| a.kind.is_interactive()) {
                let step = self.ledger.step();
                self.branch_trail.retain(|(at, _)| *at < step);
                log::debug!(target: TARGET_FLOW, "[Back] to step {}", step);
                return;
            }
        }
        for _ in 0..moved {
            self.ledger.advance();
        }
        log::debug!(target: TARGET_FLOW, "[Back] nothing to go back to");
    }

    fn replay_silently(&mut self, event: &Event, step: usize, trail: &[BranchId]) -> Result<(), EngineError> {
        self.begin(event)?;

        let mut choices = trail.iter();
        while self.ledger.step() < step {
            let Some(action) = self.ledger.current().cloned() else {
                return Err(EngineError::SaveMismatch(format!(
                    "'{}' has no action at step {}",
                    event.name,
                    self.ledger.step() + 1
                )));
            };
            self.live.game = action.game_snapshot.clone();
            self.live.engine = action.engine_snapshot.clone();

            let moved = match &action.kind {
                ActionKind::ShowText => self.ledger.advance(),
                ActionKind::ShowChoices => {
                    let branch = choices.next().cloned().ok_or_else(|| {
                        EngineError::SaveMismatch(format!("missing choice at step {}", self.ledger.step()))
                    })?;
                    self.branch_trail.push((self.ledger.step(), branch.clone()));
                    self.live.engine.choices = None;
                    matches!(self.enter_branch(event, &branch)?, Flow::Moved)
                }
                ActionKind::Jump { branch } => matches!(self.enter_branch(event, branch)?, Flow::Moved),
                ActionKind::RunCustom { id, .. } => {
                    return Err(EngineError::SaveMismatch(format!(
                        "cannot replay past custom action '{id}'"
                    )));
                }
            };
            if !moved {
                return Err(EngineError::SaveMismatch(format!(
                    "'{}' ended before step {}",
                    event.name, step
                )));
            }
        }
        Ok(())
    }
}
