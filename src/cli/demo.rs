//! Built-in demo story for the terminal player

use crate::error::CustomActionError;
use crate::runtime::custom::CustomActionTable;
use crate::types::{ChoiceOption, Event, GameState, Location, LocationId, StaticCatalog, Text};

pub const START: &str = "station";

pub fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with(Location::new("station", "station_day.png").with_timed_background(18, 6, "station_night.png"))
        .with(Location::new("cafe", "cafe.png"))
        .with(Location::new("shrine", "shrine.png").with_timed_background(20, 5, "shrine_night.png"))
}

pub fn location_names() -> [&'static str; 3] {
    ["station", "cafe", "shrine"]
}

pub fn starting_game() -> GameState {
    let mut game = GameState::new();
    game.location = Some(LocationId::from(START));
    game.hour = 9;
    game
}

pub fn custom_actions() -> CustomActionTable {
    CustomActionTable::new().register("omikuji", |args, game| {
        let draws = args.get("draws").and_then(|v| v.as_u64()).ok_or_else(|| {
            CustomActionError::InvalidArgs {
                id: "omikuji".into(),
                reason: "missing 'draws'".into(),
            }
        })?;
        let luck = (game.day as u64 + game.hour as u64 + draws) % 3;
        let fortune = ["great blessing", "small blessing", "curse"][luck as usize];
        println!("[omikuji] You unfold the paper: {}", fortune);
        Ok(serde_json::json!({ "fortune": fortune }))
    })
}

pub fn events() -> Vec<(&'static str, Event)> {
    vec![
        ("station", arrival()),
        ("cafe", cafe_talk()),
        ("shrine", shrine_visit()),
    ]
}

fn arrival() -> Event {
    Event::new("arrival", |scene| {
        scene.set_background("station_day.png");
        scene.show_text("The train doors slide open.")?;
        scene.set_foreground(["mika_smile"]);
        scene.say("Mika", "You made it! I was starting to worry.")?;
        scene.show_choices([
            ChoiceOption::new("Sorry, the train was late.", "apologize"),
            ChoiceOption::new("You worry too much.", "tease"),
        ])
    })
    .with_id("demo-arrival")
    .locked_when(|game| game.is_set("arrived"))
    .branch("apologize", |scene| {
        scene.game_mut().relationship_mut("mika").affinity += 1;
        scene.say("Mika", "It's fine. Let's get coffee.")?;
        scene.jump("wrap_up")
    })
    .branch("tease", |scene| {
        scene.game_mut().relationship_mut("mika").affinity -= 1;
        scene.replace_foreground("mika_smile", "mika_pout");
        scene.say("Mika", "Hmph. You're buying the coffee then.")?;
        scene.jump("wrap_up")
    })
    .branch("wrap_up", |scene| {
        scene.clear_foreground();
        scene.show_text("(Try 'go cafe' when the scene ends.)")?;
        scene.game_mut().set_flag("arrived", true);
        Ok(())
    })
}

fn cafe_talk() -> Event {
    Event::new("cafe_talk", |scene| {
        scene.set_foreground(["mika_smile"]);
        let affinity = scene.game().relationships.get("mika").map(|r| r.affinity).unwrap_or(0);
        if affinity > 0 {
            scene.say("Mika", "Thanks again for coming all this way.")?;
        } else {
            scene.say("Mika", "Two coffees. Your treat, remember?")?;
        }
        scene.say(
            "Mika",
            Text::localized([("en", "Have you visited the shrine yet?"), ("ja", "神社にはもう行った？")]),
        )?;
        scene.show_text("(The shrine is open now: 'go shrine'.)")?;
        scene.game_mut().set_flag("heard_about_shrine", true);
        Ok(())
    })
    .unlocked_when(|game| game.is_set("arrived"))
    .locked_when(|game| game.is_set("heard_about_shrine"))
}

fn shrine_visit() -> Event {
    Event::new("shrine_visit", |scene| {
        scene.show_text("Paper fortunes flutter on the branches.")?;
        scene.game_mut().add_stat("shrine_visits", 1);
        scene.run_custom("omikuji", serde_json::json!({ "draws": 1 }))
    })
    .unlocked_when(|game| game.is_set("heard_about_shrine"))
    .conditions(|game| game.stat("shrine_visits") < 3)
}
