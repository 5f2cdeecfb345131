use meguri::{
    ChoiceOption, Engine, EngineConfig, Event, Frame, InputSignal, SaveGame, WaitCoordinator, WaitKind, load, save,
};
use tokio::sync::watch;

fn story() -> Event {
    Event::new("visit", |scene| {
        scene.set_background("porch.png");
        scene.say("Mika", "Come in!")?;
        scene.show_choices([
            ChoiceOption::new("Take off shoes", "polite"),
            ChoiceOption::new("Walk right in", "rude"),
        ])
    })
    .branch("polite", |scene| {
        scene.game_mut().relationship_mut("mika").affinity += 2;
        scene.say("Mika", "Make yourself at home.")?;
        scene.say("Mika", "Tea?")
    })
    .branch("rude", |scene| {
        scene.game_mut().relationship_mut("mika").affinity -= 2;
        scene.say("Mika", "...")
    })
}

fn engine() -> Engine {
    Engine::builder(EngineConfig::default()).event("home", story()).build()
}

fn shown(frames: &watch::Receiver<Frame>) -> Option<String> {
    frames.borrow().state.engine.dialogue.as_ref().map(|d| d.text.clone())
}

async fn continue_and_note(coordinator: &WaitCoordinator, frames: &watch::Receiver<Frame>) -> Option<String> {
    coordinator.armed(WaitKind::Continue).await;
    let line = shown(frames);
    coordinator.handle(InputSignal::Continue);
    line
}

/// A save taken inside a branch replays to the same line in a fresh engine
#[tokio::test]
async fn save_mid_branch_resumes_on_the_saved_line() {
    let mut first = engine();
    let coordinator = first.coordinator();
    let frames = first.subscribe();

    let driver = async {
        continue_and_note(&coordinator, &frames).await;
        coordinator.armed(WaitKind::Choice).await;
        coordinator.handle(InputSignal::ChoiceSelected(0));

        coordinator.armed(WaitKind::Continue).await;
        let snapshot = SaveGame::from_frame(&frames.borrow());
        coordinator.handle(InputSignal::Continue);
        continue_and_note(&coordinator, &frames).await;
        snapshot
    };
    let (result, snapshot) = tokio::join!(first.play("visit"), driver);
    result.unwrap();

    assert_eq!(snapshot.current_event.as_deref(), Some("visit"));
    assert_eq!(snapshot.branch_trail, vec![meguri::BranchId::from("polite")]);
    assert_eq!(snapshot.engine.dialogue.as_ref().unwrap().text, "Make yourself at home.");
    assert_eq!(snapshot.game.relationships["mika"].affinity, 2);

    let bytes = save(&snapshot).unwrap();
    let restored = load(&bytes).unwrap();
    assert_eq!(restored, snapshot);

    let mut second = engine();
    let coordinator = second.coordinator();
    let frames = second.subscribe();
    let driver = async {
        let again = continue_and_note(&coordinator, &frames).await;
        let next = continue_and_note(&coordinator, &frames).await;
        (again, next)
    };
    let (result, (again, next)) = tokio::join!(second.load(restored), driver);

    let end = result.unwrap().expect("an event was in progress");
    assert_eq!(end.event, "visit");
    assert_eq!(again.as_deref(), Some("Make yourself at home."));
    assert_eq!(next.as_deref(), Some("Tea?"));
    assert_eq!(second.live().game.relationships["mika"].affinity, 2);
    assert_eq!(second.live().engine.background.as_deref(), Some("porch.png"));
}

/// A save taken between events restores live state without playing anything
#[tokio::test]
async fn idle_save_restores_live_state_only() {
    let mut first = engine();
    let mut snapshot = first.save();
    snapshot.game.set_flag("visited", true);
    snapshot.game.hour = 17;

    let restored = load(&save(&snapshot).unwrap()).unwrap();
    let mut second = engine();
    assert!(second.load(restored).await.unwrap().is_none());
    assert!(second.live().game.is_set("visited"));
    assert_eq!(second.live().game.hour, 17);
    assert!(first.take_author_reports().is_empty());
}

/// A trail that no longer matches the story is rejected
#[tokio::test]
async fn save_with_missing_choice_is_a_mismatch() {
    let mut engine = engine();
    let mut snapshot = engine.save();
    snapshot.current_event = Some("visit".into());
    snapshot.current_step = 3;

    let err = engine.load(snapshot).await.unwrap_err();
    assert!(matches!(err, meguri::EngineError::SaveMismatch(_)));
    assert!(engine.subscribe().borrow().event.is_none());
}
