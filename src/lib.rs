//! # meguri
//!
//! A narrative-event runtime for visual novel-like games. Events are authored
//! as scripts that show text, present choices, branch and change game data.
//! Each script is first simulated against private copies of state, producing
//! a list of actions with full snapshots; playback then walks those actions
//! with real player input, so the player can step back and forth through
//! revealed beats without any script code running again.
//!
//! ## Quick Start
//!
//! ```rust
//! use meguri::{ChoiceOption, Engine, EngineConfig, Event, InputSignal, WaitKind};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let event = Event::new("greeting", |scene| {
//!     scene.say("Mika", "Hello!")?;
//!     scene.show_choices([ChoiceOption::new("Wave back", "wave")])
//! })
//! .branch("wave", |scene| {
//!     scene.game_mut().relationship_mut("mika").affinity += 1;
//!     scene.say("Mika", "Hehe.")
//! });
//!
//! let mut engine = Engine::builder(EngineConfig::default())
//!     .event("station", event)
//!     .build();
//! let input = engine.coordinator();
//!
//! let player = async {
//!     input.armed(WaitKind::Continue).await;
//!     input.handle(InputSignal::Continue);
//!     input.armed(WaitKind::Choice).await;
//!     input.handle(InputSignal::ChoiceSelected(0));
//!     input.armed(WaitKind::Continue).await;
//!     input.handle(InputSignal::Continue);
//! };
//! let (end, ()) = tokio::join!(engine.play("greeting"), player);
//! end?;
//!
//! assert_eq!(engine.live().game.relationships["mika"].affinity, 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod runtime;
pub mod storage;
pub mod types;

pub use config::EngineConfig;
pub use error::{CustomActionError, EngineError, SceneError, WaitError};
pub use runtime::coordinator::{InputSignal, Navigation, Resolution, WaitCoordinator, WaitKind, WorldAction};
pub use runtime::custom::{CustomActionDispatcher, CustomActionTable, NoCustomActions};
pub use runtime::executor::{Frame, LiveState, PlaybackEnd};
pub use runtime::history::Ledger;
pub use runtime::lifecycle::{EventRegistry, Lifecycle};
pub use runtime::simulator::{Scene, Simulator};
pub use runtime::{Engine, EngineBuilder, TickOutcome};
pub use storage::{SaveGame, load, save};
pub use types::{
    Action, ActionKind, BranchId, ChoiceOption, EngineState, Event, EventRef, GameState, Location,
    LocationCatalog, LocationId, StaticCatalog, Text,
};
