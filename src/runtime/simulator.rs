//! Simulation passes
//!
//! A pass runs one script against private clones of game and engine state and
//! records an ordered list of [`Action`]s. Live state is never touched here.

use crate::error::{EngineError, SceneError};
use crate::runtime::debug::TARGET_FLOW;
use crate::types::{
    Action, ActionKind, BranchId, Choice, ChoiceOption, Dialogue, EngineState, EventRef, GameState,
    Script, Text,
};

/// The engine API handed to scripts
///
/// Recording calls (`show_text`, `say`, `show_choices`, `jump`, `run_custom`)
/// append actions. Visual directives (`set_background` and the foreground
/// calls) only change the engine-state clone and show up in the snapshot of
/// the next recorded action.
#[derive(Debug)]
pub struct Scene {
    source: EventRef,
    language: String,
    game: GameState,
    engine: EngineState,
    actions: Vec<Action>,
    ended: bool,
    dead_end: Option<SceneError>,
}

impl Scene {
    pub fn new(source: EventRef, language: impl Into<String>, game: GameState, engine: EngineState) -> Self {
        Self {
            source,
            language: language.into(),
            game,
            engine,
            actions: Vec::new(),
            ended: false,
            dead_end: None,
        }
    }

    pub fn source(&self) -> &EventRef {
        &self.source
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    /// Whether a choice, jump or custom action already closed this pass
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Narration without a speaker
    pub fn show_text(&mut self, text: impl Into<Text>) -> Result<(), SceneError> {
        self.record_text(None, text.into())
    }

    /// A line spoken by `speaker`
    pub fn say(&mut self, speaker: impl Into<String>, text: impl Into<Text>) -> Result<(), SceneError> {
        self.record_text(Some(speaker.into()), text.into())
    }

    pub fn show_choices<I>(&mut self, options: I) -> Result<(), SceneError>
    where
        I: IntoIterator<Item = ChoiceOption>,
    {
        self.ensure_open("show_choices")?;
        let choices = options
            .into_iter()
            .map(|option| Choice {
                text: option.text.resolve(&self.language),
                branch: option.branch,
            })
            .collect();
        self.engine.choices = Some(choices);
        self.record(ActionKind::ShowChoices);
        self.ended = true;
        Ok(())
    }

    pub fn jump(&mut self, branch: impl Into<BranchId>) -> Result<(), SceneError> {
        self.ensure_open("jump")?;
        self.record(ActionKind::Jump {
            branch: branch.into(),
        });
        self.ended = true;
        Ok(())
    }

    pub fn run_custom(&mut self, id: impl Into<String>, args: serde_json::Value) -> Result<(), SceneError> {
        self.ensure_open("run_custom")?;
        self.record(ActionKind::RunCustom { id: id.into(), args });
        self.ended = true;
        Ok(())
    }

    pub fn set_background(&mut self, background: impl Into<String>) {
        self.engine.background = Some(background.into());
    }

    pub fn set_foreground<I, S>(&mut self, layers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine.foreground = layers.into_iter().map(Into::into).collect();
    }

    pub fn add_foreground(&mut self, layer: impl Into<String>) {
        self.engine.foreground.push(layer.into());
    }

    /// Swap `old` for `new` in place. Returns false when `old` isn't shown.
    pub fn replace_foreground(&mut self, old: &str, new: impl Into<String>) -> bool {
        match self.engine.foreground.iter_mut().find(|layer| layer.as_str() == old) {
            Some(layer) => {
                *layer = new.into();
                true
            }
            None => false,
        }
    }

    pub fn clear_foreground(&mut self) {
        self.engine.foreground.clear();
    }

    /// Build a script error tagged with this scene's source
    pub fn fail(&self, message: impl Into<String>) -> SceneError {
        SceneError::Script {
            source_ref: self.source.clone(),
            message: message.into(),
        }
    }

    fn record_text(&mut self, speaker: Option<String>, text: Text) -> Result<(), SceneError> {
        self.ensure_open("show_text")?;
        self.engine.dialogue = Some(Dialogue {
            speaker,
            text: text.resolve(&self.language),
        });
        self.record(ActionKind::ShowText);
        // every action starts from a clean dialogue baseline
        self.engine.dialogue = None;
        Ok(())
    }

    fn record(&mut self, kind: ActionKind) {
        log::trace!(target: TARGET_FLOW, "[Record] {} #{} in {}", kind.name(), self.actions.len(), self.source);
        self.actions
            .push(Action::new(kind, self.source.clone(), &self.game, &self.engine));
    }

    fn ensure_open(&mut self, call: &'static str) -> Result<(), SceneError> {
        if !self.ended {
            return Ok(());
        }
        let err = SceneError::EventAlreadyEnded {
            source_ref: self.source.clone(),
            call,
        };
        if self.dead_end.is_none() {
            self.dead_end = Some(err.clone());
        }
        Err(err)
    }

    fn finish(self) -> (Pass, Option<SceneError>) {
        let pass = Pass {
            actions: self.actions,
            final_game: self.game,
        };
        (pass, self.dead_end)
    }
}

/// Result of one simulation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub actions: Vec<Action>,
    /// Game state when the script returned, including changes made after
    /// the last recorded action
    pub final_game: GameState,
}

/// Runs scripts and tracks authored dead ends for the session
#[derive(Debug)]
pub struct Simulator {
    language: String,
    surface_dead_ends: bool,
    mute_after_first: bool,
    dead_ends_seen: usize,
    reports: Vec<SceneError>,
}

impl Simulator {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            surface_dead_ends: false,
            mute_after_first: false,
            dead_ends_seen: 0,
            reports: Vec::new(),
        }
    }

    /// Collect dead ends for the content author rather than only logging them
    pub fn surface_dead_ends(mut self, surface: bool) -> Self {
        self.surface_dead_ends = surface;
        self
    }

    pub fn mute_after_first(mut self, mute: bool) -> Self {
        self.mute_after_first = mute;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Run `script` against clones of `game` and `engine`.
    ///
    /// Dead ends are reported and swallowed; the actions recorded before the
    /// pass ended are still returned. Any other script error is a fault.
    pub fn simulate(
        &mut self,
        script: &Script,
        source: EventRef,
        game: &GameState,
        engine: &EngineState,
    ) -> Result<Vec<Action>, EngineError> {
        self.simulate_pass(script, source, game, engine).map(|pass| pass.actions)
    }

    /// Like [`Simulator::simulate`], also returning the game state the script
    /// finished with
    pub fn simulate_pass(
        &mut self,
        script: &Script,
        source: EventRef,
        game: &GameState,
        engine: &EngineState,
    ) -> Result<Pass, EngineError> {
        let mut scene = Scene::new(source.clone(), self.language.clone(), game.clone(), engine.clone());
        let result = script(&mut scene);
        let (pass, dead_end) = scene.finish();

        match result {
            Ok(()) => {}
            Err(err) if err.is_dead_end() => {}
            Err(err) => return Err(EngineError::Scene(err)),
        }
        if let Some(err) = dead_end {
            self.report_dead_end(err);
        }

        log::debug!(target: TARGET_FLOW, "[Simulate] {} produced {} actions", source, pass.actions.len());
        Ok(pass)
    }

    /// Dead ends collected for the content author since the last call
    pub fn take_reports(&mut self) -> Vec<SceneError> {
        std::mem::take(&mut self.reports)
    }

    fn report_dead_end(&mut self, err: SceneError) {
        self.dead_ends_seen += 1;
        if self.mute_after_first && self.dead_ends_seen > 1 {
            log::debug!(target: TARGET_FLOW, "[DeadEnd] (muted) {}", err);
            return;
        }
        if self.surface_dead_ends {
            log::error!(target: TARGET_FLOW, "[DeadEnd] {}", err);
            self.reports.push(err);
        } else {
            log::warn!(target: TARGET_FLOW, "[DeadEnd] {}", err);
        }
    }
}
