//! CUI player mode for the demo story
//!
//! The engine runs on a tokio runtime. Stdin is read on a plain thread and
//! forwarded to the wait coordinator; a render task prints every new frame.

use crate::{
    cli::{
        demo,
        view_state::{clear_screen, render_delta, ViewState},
    },
    config::EngineConfig,
    runtime::{
        coordinator::{InputSignal, Resolution, WaitCoordinator, WorldAction},
        debug::DebugLogger,
        executor::Frame,
        Engine,
    },
    storage::{self, SaveGame},
    types::{Choice, Dialogue, LocationId},
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Options for `meguri play`
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub debug: bool,
    /// Slot to continue from
    pub load_slot: Option<u8>,
    pub save_dir: PathBuf,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            debug: false,
            load_slot: None,
            save_dir: PathBuf::from("saves"),
        }
    }
}

/// One line of player input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Signal(InputSignal),
    ToggleSkip,
    Save(u8),
    Quit,
    Help,
    Unknown(String),
}

/// Map a line of input to a command
pub fn parse_command(line: &str) -> Command {
    let input = line.trim();
    let mut words = input.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => Command::Signal(InputSignal::Continue),
        (Some("b"), None) => Command::Signal(InputSignal::GoBack),
        (Some("s"), None) => Command::ToggleSkip,
        (Some("q"), None) => Command::Quit,
        (Some("h"), None) => Command::Help,
        (Some("save"), None) => Command::Save(1),
        (Some("save"), Some(slot)) => match slot.parse() {
            Ok(slot) => Command::Save(slot),
            Err(_) => Command::Unknown(input.to_string()),
        },
        (Some("go"), Some(place)) => {
            Command::Signal(InputSignal::WorldAction(WorldAction::Travel(LocationId::from(place))))
        }
        (Some("rest"), Some(hours)) => match hours.parse() {
            Ok(hours) => Command::Signal(InputSignal::WorldAction(WorldAction::Rest { hours })),
            Err(_) => Command::Unknown(input.to_string()),
        },
        (Some(number), None) => match number.parse::<usize>() {
            // Convert 1-based to 0-based index
            Ok(choice) if (1..=9).contains(&choice) => Command::Signal(InputSignal::ChoiceSelected(choice - 1)),
            _ => Command::Unknown(input.to_string()),
        },
        _ => Command::Unknown(input.to_string()),
    }
}

/// Run the player mode
pub fn run_play(options: PlayOptions) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(play(options))
}

async fn play(options: PlayOptions) -> anyhow::Result<()> {
    let mut config = EngineConfig::default();
    if options.debug {
        config.debug = true;
        config.debug_log.enabled = true;
    }
    DebugLogger::install(config.debug_log.clone())
        .map_err(|err| anyhow::anyhow!("failed to install logger: {}", err))?;

    let mut builder = Engine::builder(config)
        .catalog(demo::catalog())
        .dispatcher(demo::custom_actions())
        .game(demo::starting_game());
    for (location, event) in demo::events() {
        builder = builder.event(location, event);
    }
    let mut engine = builder.build();

    println!("=== meguri Demo Player ===");
    println!();
    print_controls();

    let renderer = tokio::spawn(render(engine.subscribe(), options.debug));

    let coordinator = engine.coordinator();
    let frames = engine.subscribe();
    let handle = tokio::runtime::Handle::current();
    let save_dir = options.save_dir.clone();
    std::thread::spawn(move || input_loop(coordinator, frames, handle, save_dir));

    if let Some(slot) = options.load_slot {
        match storage::read_slot(&options.save_dir, slot).await? {
            Some(save) => {
                println!("[Loaded slot {}]", slot);
                engine.load(save).await?;
            }
            None => println!("[Slot {} is empty, starting a new game]", slot),
        }
    }

    let result = engine.run().await;
    renderer.abort();
    for report in engine.take_author_reports() {
        eprintln!("[author] {}", report);
    }
    result?;

    println!("Goodbye!");
    Ok(())
}

fn print_controls() {
    println!("Controls:");
    println!("  Enter:         next");
    println!("  1-9:           select choice");
    println!("  b:             back");
    println!("  s:             toggle skip");
    println!("  go <place>:    travel ({})", demo::location_names().join(", "));
    println!("  rest <hours>:  let time pass");
    println!("  save [slot]:   save the game");
    println!("  h:             help");
    println!("  q:             quit");
    println!();
}

fn input_loop(
    coordinator: Arc<WaitCoordinator>,
    frames: watch::Receiver<Frame>,
    runtime: tokio::runtime::Handle,
    save_dir: PathBuf,
) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match parse_command(&line) {
            Command::Signal(signal) => coordinator.handle(signal),
            Command::ToggleSkip => {
                let on = !coordinator.is_skipping();
                println!("[Skip {}]", if on { "on" } else { "off" });
                coordinator.handle(InputSignal::SkipMode(on));
            }
            Command::Save(slot) => {
                let save = SaveGame::from_frame(&frames.borrow());
                match runtime.block_on(storage::write_slot(&save_dir, slot, &save)) {
                    Ok(path) => println!("[Saved to {}]", path.display()),
                    Err(err) => println!("[Save failed: {}]", err),
                }
            }
            Command::Quit => {
                // outside the idle loop there is nobody to hand the quit to
                if !coordinator.resolve(Resolution::WorldAction(WorldAction::Quit)) {
                    println!("Goodbye!");
                    std::process::exit(0);
                }
            }
            Command::Help => print_controls(),
            Command::Unknown(input) => println!("Unknown command '{}'. Type 'h' for help.", input),
        }
    }
}

/// What was last printed, so unchanged frames are skipped
#[derive(Debug, PartialEq)]
struct Shown {
    event: Option<String>,
    step: usize,
    dialogue: Option<Dialogue>,
    choices: Option<Vec<Choice>>,
    location: Option<LocationId>,
    hour: u8,
    day: u32,
}

impl Shown {
    fn of(frame: &Frame) -> Self {
        let game = &frame.state.game;
        let engine = &frame.state.engine;
        Self {
            event: frame.event.clone(),
            step: frame.step,
            dialogue: engine.dialogue.clone(),
            choices: engine.choices.clone(),
            location: game.location.clone(),
            hour: game.hour,
            day: game.day,
        }
    }
}

async fn render(mut frames: watch::Receiver<Frame>, debug: bool) {
    let mut view_state = ViewState::new();
    let mut shown: Option<Shown> = None;

    loop {
        let (frame, current) = {
            let frame = frames.borrow_and_update();
            (Frame::clone(&frame), Shown::of(&frame))
        };
        if shown.as_ref() != Some(&current) {
            // Render delta (only show what changed)
            render_delta(&view_state.apply(&frame.state.engine));
            show_frame(&frame);
            if debug {
                display_debug_info(&frame);
            }
            shown = Some(current);
        }
        if frames.changed().await.is_err() {
            break;
        }
    }
}

fn show_frame(frame: &Frame) {
    let engine = &frame.state.engine;
    if frame.event.is_none() {
        let game = &frame.state.game;
        let place = game.location.as_ref().map(|l| l.as_str()).unwrap_or("nowhere");
        println!("[Day {} {:02}:00 at {}]", game.day, game.hour, place);
        println!("go <place> | rest <hours> | q");
        println!();
        return;
    }

    if let Some(choices) = &engine.choices {
        // Clear screen for choice display
        clear_screen();
        show_dialogue(engine.dialogue.as_ref());
        println!("--- Choice ---");
        for (i, choice) in choices.iter().enumerate() {
            println!("{}. {}", i + 1, choice.text);
        }
        println!();
        println!("Select (1-9):");
        return;
    }

    show_dialogue(engine.dialogue.as_ref());
}

fn show_dialogue(dialogue: Option<&Dialogue>) {
    let Some(dialogue) = dialogue else { return };
    if let Some(speaker) = &dialogue.speaker {
        println!("{}:", speaker);
    }
    println!("{}", dialogue.text);
    println!();
}

/// Display debug information
fn display_debug_info(frame: &Frame) {
    let game = &frame.state.game;
    println!("[debug]");
    println!("  event: {:?} step: {}", frame.event, frame.step);
    if !frame.branch_trail.is_empty() {
        let trail: Vec<&str> = frame.branch_trail.iter().map(|b| b.as_str()).collect();
        println!("  branches: {}", trail.join(" -> "));
    }
    if !game.flags.is_empty() {
        let mut flags: Vec<_> = game.flags.iter().collect();
        flags.sort_by(|a, b| a.0.cmp(b.0));
        println!("  flags:");
        for (name, value) in flags {
            println!("    {} = {}", name, value);
        }
    }
    if !game.stats.is_empty() {
        println!("  stats:");
        for (name, value) in &game.stats {
            println!("    {} = {}", name, value);
        }
    }
    for (npc, relationship) in &game.relationships {
        println!("  {}: affinity {}", npc, relationship.affinity);
    }
    println!();
}
