//! Tests for the playback runtime

use super::*;
use crate::error::CustomActionError;
use crate::runtime::coordinator::InputSignal;
use crate::runtime::custom::CustomActionTable;
use crate::types::{ActionKind, BranchId, ChoiceOption, Location};
use std::sync::Mutex;

fn test_config() -> EngineConfig {
    EngineConfig {
        debug: true,
        fault_pause_ms: 1,
        max_consecutive_faults: 2,
        ..EngineConfig::default()
    }
}

fn dialogue(frames: &watch::Receiver<Frame>) -> Option<String> {
    frames
        .borrow()
        .state
        .engine
        .dialogue
        .as_ref()
        .map(|d| d.text.clone())
}

/// Wait until playback wants `kind`, note the line on screen, then send `signal`
async fn answer(
    coordinator: &WaitCoordinator,
    frames: &watch::Receiver<Frame>,
    kind: WaitKind,
    signal: InputSignal,
) -> Option<String> {
    coordinator.armed(kind).await;
    let shown = dialogue(frames);
    coordinator.handle(signal);
    shown
}

async fn next(coordinator: &WaitCoordinator, frames: &watch::Receiver<Frame>) -> Option<String> {
    answer(coordinator, frames, WaitKind::Continue, InputSignal::Continue).await
}

#[tokio::test]
async fn text_text_choice_plays_in_order_and_enters_branch() {
    let event = Event::new("E", |scene| {
        scene.show_text("a")?;
        scene.show_text("b")?;
        scene.show_choices([ChoiceOption::new("x", "X")])
    })
    .branch("X", |scene| {
        scene.game_mut().set_flag("took_x", true);
        scene.show_text("in X")
    });
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        let a = next(&coordinator, &frames).await;
        let b = next(&coordinator, &frames).await;
        coordinator.armed(WaitKind::Choice).await;
        let choices = frames.borrow().state.engine.choices.clone();
        coordinator.handle(InputSignal::ChoiceSelected(0));
        let x = next(&coordinator, &frames).await;
        (vec![a, b, x], choices)
    };
    let (result, (seen, choices)) = tokio::join!(engine.play("E"), driver);

    let end = result.unwrap();
    assert_eq!(end.actions_played, 4);
    assert_eq!(
        seen,
        vec![Some("a".to_string()), Some("b".to_string()), Some("in X".to_string())]
    );
    let choices = choices.unwrap();
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].text, "x");
    assert!(engine.live().game.is_set("took_x"));
    assert!(engine.live().engine.choices.is_none());
}

#[tokio::test]
async fn jump_to_missing_branch_faults_and_resets_ledger() {
    let event = Event::new("broken", |scene| {
        scene.show_text("before")?;
        scene.jump("B")
    });
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let (result, _) = tokio::join!(engine.play("broken"), next(&coordinator, &frames));

    assert!(matches!(result, Err(EngineError::UnknownBranch { .. })));
    let frame = frames.borrow().clone();
    assert_eq!(frame.event, None);
    assert_eq!(frame.step, 0);
    assert!(frame.history_tail.is_empty());
}

#[tokio::test]
async fn go_back_restores_previous_snapshot() {
    let event = Event::new("walk", |scene| {
        scene.show_text("a")?;
        scene.game_mut().add_stat("steps", 1);
        scene.show_text("b")?;
        scene.game_mut().add_stat("steps", 1);
        scene.show_text("c")
    });
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        let mut seen = Vec::new();
        seen.push(next(&coordinator, &frames).await);
        coordinator.armed(WaitKind::Continue).await;
        let at_b_first = frames.borrow().state.clone();
        seen.push(dialogue(&frames));
        coordinator.handle(InputSignal::GoBack);

        coordinator.armed(WaitKind::Continue).await;
        let steps_after_back = frames.borrow().state.game.stat("steps");
        seen.push(dialogue(&frames));
        coordinator.handle(InputSignal::Continue);

        coordinator.armed(WaitKind::Continue).await;
        let at_b_again = frames.borrow().state.clone();
        seen.push(dialogue(&frames));
        coordinator.handle(InputSignal::Continue);

        seen.push(next(&coordinator, &frames).await);
        (seen, steps_after_back, at_b_first, at_b_again)
    };
    let (result, (seen, steps_after_back, at_b_first, at_b_again)) = tokio::join!(engine.play("walk"), driver);

    result.unwrap();
    let seen: Vec<_> = seen.into_iter().flatten().collect();
    assert_eq!(seen, vec!["a", "b", "a", "b", "c"]);
    assert_eq!(steps_after_back, 0);
    // restoring the same action twice yields the same live state
    assert_eq!(at_b_first, at_b_again);
    assert_eq!(engine.live().game.stat("steps"), 2);
}

#[tokio::test]
async fn go_back_at_first_line_stays_put() {
    let event = Event::new("one", |scene| scene.show_text("only"));
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        coordinator.armed(WaitKind::Continue).await;
        coordinator.handle(InputSignal::GoBack);
        next(&coordinator, &frames).await
    };
    let (result, shown) = tokio::join!(engine.play("one"), driver);

    assert_eq!(result.unwrap().actions_played, 1);
    assert_eq!(shown.as_deref(), Some("only"));
}

#[tokio::test]
async fn go_back_skips_over_jumps() {
    let event = Event::new("hop", |scene| {
        scene.show_text("before")?;
        scene.jump("B")
    })
    .branch("B", |scene| scene.show_text("after"));
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        let mut seen = Vec::new();
        seen.push(next(&coordinator, &frames).await);
        seen.push(answer(&coordinator, &frames, WaitKind::Continue, InputSignal::GoBack).await);
        seen.push(next(&coordinator, &frames).await);
        seen.push(next(&coordinator, &frames).await);
        seen
    };
    let (result, seen) = tokio::join!(engine.play("hop"), driver);

    result.unwrap();
    let seen: Vec<_> = seen.into_iter().flatten().collect();
    assert_eq!(seen, vec!["before", "after", "before", "after"]);
}

#[tokio::test]
async fn choosing_again_after_going_back_replaces_the_future() {
    let event = Event::new("fork", |scene| {
        scene.show_text("which way?")?;
        scene.show_choices([ChoiceOption::new("left", "L"), ChoiceOption::new("right", "R")])
    })
    .branch("L", |scene| {
        scene.game_mut().set_flag("side", "left");
        scene.show_text("went left")
    })
    .branch("R", |scene| {
        scene.game_mut().set_flag("side", "right");
        scene.show_text("went right")
    });
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        next(&coordinator, &frames).await;
        answer(&coordinator, &frames, WaitKind::Choice, InputSignal::ChoiceSelected(0)).await;

        coordinator.armed(WaitKind::Continue).await;
        let left = dialogue(&frames);
        let trail_left = frames.borrow().branch_trail.clone();
        coordinator.handle(InputSignal::GoBack);

        coordinator.armed(WaitKind::Choice).await;
        let trail_back = frames.borrow().branch_trail.clone();
        coordinator.handle(InputSignal::ChoiceSelected(1));

        let right = next(&coordinator, &frames).await;
        (left, right, trail_left, trail_back)
    };
    let (result, (left, right, trail_left, trail_back)) = tokio::join!(engine.play("fork"), driver);

    result.unwrap();
    assert_eq!(left.as_deref(), Some("went left"));
    assert_eq!(right.as_deref(), Some("went right"));
    assert_eq!(trail_left, vec![BranchId::from("L")]);
    assert!(trail_back.is_empty());
    assert_eq!(engine.live().game.flag("side"), Some(&serde_json::json!("right")));
}

#[tokio::test]
async fn out_of_range_choice_keeps_waiting() {
    let event = Event::new("pick", |scene| scene.show_choices([ChoiceOption::new("only", "O")]))
        .branch("O", |scene| scene.show_text("picked"));
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        answer(&coordinator, &frames, WaitKind::Choice, InputSignal::ChoiceSelected(5)).await;
        answer(&coordinator, &frames, WaitKind::Choice, InputSignal::ChoiceSelected(0)).await;
        next(&coordinator, &frames).await
    };
    let (result, shown) = tokio::join!(engine.play("pick"), driver);

    result.unwrap();
    assert_eq!(shown.as_deref(), Some("picked"));
}

#[tokio::test]
async fn skip_mode_runs_through_text_but_stops_at_choices() {
    let event = Event::new("rush", |scene| {
        scene.show_text("one")?;
        scene.show_text("two")?;
        scene.show_text("three")?;
        scene.show_choices([ChoiceOption::new("stop", "S")])
    })
    .branch("S", |scene| {
        scene.game_mut().set_flag("stopped", true);
        Ok(())
    });
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    coordinator.handle(InputSignal::SkipMode(true));

    let driver = async {
        coordinator.armed(WaitKind::Choice).await;
        coordinator.handle(InputSignal::ChoiceSelected(0));
    };
    let (result, ()) = tokio::join!(engine.play("rush"), driver);

    assert_eq!(result.unwrap().actions_played, 4);
    // an empty branch still lands its game changes
    assert!(engine.live().game.is_set("stopped"));
    assert!(engine.live().engine.choices.is_none());
}

#[tokio::test]
async fn custom_actions_are_dispatched_once_during_playback() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let table = CustomActionTable::new().register("fishing", move |args, _game| {
        recorded.lock().unwrap().push(args.clone());
        Ok(serde_json::json!({ "caught": 2 }))
    });
    let event = Event::new("lake", |scene| {
        scene.show_text("cast the line")?;
        scene.run_custom("fishing", serde_json::json!({ "bait": "worm" }))
    });
    let mut engine = Engine::builder(test_config())
        .dispatcher(table)
        .event("lake", event)
        .build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    // simulation alone must not run the custom action
    assert!(calls.lock().unwrap().is_empty());

    let (result, _) = tokio::join!(engine.play("lake"), next(&coordinator, &frames));

    assert_eq!(result.unwrap().actions_played, 2);
    assert_eq!(*calls.lock().unwrap(), vec![serde_json::json!({ "bait": "worm" })]);
}

#[tokio::test]
async fn unknown_custom_action_is_a_fault() {
    let event = Event::new("odd", |scene| scene.run_custom("nope", serde_json::Value::Null));
    let mut engine = Engine::builder(test_config()).event("here", event).build();

    let result = engine.play("odd").await;
    assert!(matches!(
        result,
        Err(EngineError::CustomAction(CustomActionError::Unknown(_)))
    ));
}

#[tokio::test]
async fn dead_ends_are_reported_without_stopping_playback() {
    let event = Event::new("sloppy", |scene| {
        scene.show_choices([ChoiceOption::new("go", "G")])?;
        scene.show_text("unreachable")
    })
    .branch("G", |_| Ok(()));
    let mut engine = Engine::builder(test_config()).event("here", event).build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let (result, _) = tokio::join!(
        engine.play("sloppy"),
        answer(&coordinator, &frames, WaitKind::Choice, InputSignal::ChoiceSelected(0))
    );

    result.unwrap();
    let reports = engine.take_author_reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_dead_end());
}

#[tokio::test]
async fn unknown_event_is_a_fault() {
    let mut engine = Engine::builder(test_config()).build();
    assert!(matches!(engine.play("ghost").await, Err(EngineError::UnknownEvent(_))));
}

#[tokio::test]
async fn tick_applies_location_background_and_plays_ready_event() {
    let mut game = GameState::new();
    game.location = Some(LocationId::from("park"));
    game.hour = 20;
    let catalog = StaticCatalog::new()
        .with(Location::new("park", "park_day.png").with_timed_background(18, 24, "park_night.png"));
    let event = Event::new("stroll", |scene| {
        scene.game_mut().set_flag("strolled", true);
        scene.show_text("the lamps are on")
    })
    .locked_when(|game| game.is_set("strolled"));

    let mut engine = Engine::builder(test_config())
        .catalog(catalog)
        .game(game)
        .event("park", event)
        .build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        coordinator.armed(WaitKind::Continue).await;
        let background = frames.borrow().state.engine.background.clone();
        coordinator.handle(InputSignal::Continue);
        background
    };
    let (outcome, background) = tokio::join!(engine.tick(), driver);

    assert_eq!(outcome.unwrap(), TickOutcome::Played(EventRef::root("stroll")));
    assert_eq!(background.as_deref(), Some("park_night.png"));
    assert_eq!(engine.registry().lifecycle("stroll"), Some(lifecycle::Lifecycle::Locked));
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn tick_without_location_is_idle() {
    let mut engine = Engine::builder(test_config()).build();
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn run_travels_and_quits_on_world_actions() {
    let catalog = StaticCatalog::new()
        .with(Location::new("home", "home.png"))
        .with(Location::new("shop", "shop.png"));
    let event = Event::new("shopping", |scene| {
        scene.game_mut().set_flag("shopped", true);
        scene.show_text("welcome!")
    })
    .locked_when(|game| game.is_set("shopped"));
    let mut game = GameState::new();
    game.location = Some(LocationId::from("home"));

    let mut engine = Engine::builder(test_config())
        .catalog(catalog)
        .game(game)
        .event("shop", event)
        .build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let driver = async {
        coordinator.armed(WaitKind::WorldAction).await;
        coordinator.handle(InputSignal::WorldAction(WorldAction::Travel(LocationId::from("shop"))));
        let shown = next(&coordinator, &frames).await;
        coordinator.armed(WaitKind::WorldAction).await;
        coordinator.handle(InputSignal::WorldAction(WorldAction::Quit));
        shown
    };
    let (result, shown) = tokio::join!(engine.run(), driver);

    result.unwrap();
    assert_eq!(shown.as_deref(), Some("welcome!"));
    assert_eq!(engine.live().engine.background.as_deref(), Some("shop.png"));
    assert!(engine.live().game.is_set("shopped"));
}

#[tokio::test]
async fn changes_after_the_last_line_reach_live_state_and_lock_the_event() {
    let catalog = StaticCatalog::new().with(Location::new("gate", "gate.png"));
    let event = Event::new("farewell", |scene| {
        scene.show_text("goodbye")?;
        scene.game_mut().set_flag("done", true);
        scene.game_mut().add_stat("farewells", 1);
        Ok(())
    })
    .locked_when(|game| game.is_set("done"));
    let mut game = GameState::new();
    game.location = Some(LocationId::from("gate"));
    let mut engine = Engine::builder(test_config())
        .catalog(catalog)
        .game(game)
        .event("gate", event)
        .build();
    let coordinator = engine.coordinator();
    let frames = engine.subscribe();

    let (outcome, shown) = tokio::join!(engine.tick(), next(&coordinator, &frames));

    assert!(matches!(outcome.unwrap(), TickOutcome::Played(_)));
    assert_eq!(shown.as_deref(), Some("goodbye"));
    assert!(engine.live().game.is_set("done"));
    assert_eq!(engine.live().game.stat("farewells"), 1);
    assert!(frames.borrow().state.game.is_set("done"));
    assert_eq!(engine.registry().lifecycle("farewell"), Some(lifecycle::Lifecycle::Locked));
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn run_survives_the_longest_rest() {
    let mut game = GameState::new();
    game.location = Some(LocationId::from("inn"));
    game.hour = 5;
    let mut engine = Engine::builder(test_config())
        .catalog(StaticCatalog::new().with(Location::new("inn", "inn.png")))
        .game(game)
        .build();
    let coordinator = engine.coordinator();

    let driver = async {
        coordinator.armed(WaitKind::WorldAction).await;
        coordinator.handle(InputSignal::WorldAction(WorldAction::Rest { hours: u32::MAX }));
        coordinator.armed(WaitKind::WorldAction).await;
        coordinator.handle(InputSignal::WorldAction(WorldAction::Quit));
    };
    let (result, ()) = tokio::join!(engine.run(), driver);

    result.unwrap();
    assert_eq!(engine.live().game.hour, 20);
    assert_eq!(engine.live().game.day, 178_956_970);
}

#[tokio::test]
async fn run_gives_up_after_repeated_faults() {
    let event = Event::new("loop", |scene| scene.jump("missing"));
    let mut game = GameState::new();
    game.location = Some(LocationId::from("here"));
    let mut engine = Engine::builder(test_config())
        .catalog(StaticCatalog::new().with(Location::new("here", "here.png")))
        .game(game)
        .event("here", event)
        .build();
    let frames = engine.subscribe();

    let result = engine.run().await;

    assert!(matches!(result, Err(EngineError::TooManyFaults(2))));
    assert_eq!(frames.borrow().step, 0);
    assert!(frames.borrow().event.is_none());
}

#[tokio::test]
async fn simulation_records_kinds_in_order() {
    let mut simulator = Simulator::new("en");
    let event = Event::new("E", |scene| {
        scene.show_text("a")?;
        scene.show_text("b")?;
        scene.show_choices([ChoiceOption::new("x", "X")])
    });
    let actions = simulator
        .simulate(&event.execute, event.root_ref(), &GameState::new(), &Default::default())
        .unwrap();

    let kinds: Vec<_> = actions.iter().map(|a| a.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![ActionKind::ShowText, ActionKind::ShowText, ActionKind::ShowChoices]
    );
}
