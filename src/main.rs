//! CLI entry point for meguri
//!
//! Plays the built-in demo story in the terminal.

use std::path::PathBuf;
use std::process;

use meguri::cli::play::{run_play, PlayOptions};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" => match parse_play_options(&args[2..]) {
            Ok(options) => {
                if let Err(err) = run_play(options) {
                    eprintln!("Error: Player mode failed");
                    eprintln!("Reason: {}", err);
                    process::exit(1);
                }
            }
            Err(message) => {
                eprintln!("Error: {}", message);
                eprintln!();
                print_usage();
                process::exit(1);
            }
        },
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn parse_play_options(args: &[String]) -> Result<PlayOptions, String> {
    let mut options = PlayOptions::default();
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" => options.debug = true,
            "--load" => {
                let slot = args.next().ok_or("Missing slot number after --load")?;
                let slot = slot.parse().map_err(|_| format!("Invalid slot '{}'", slot))?;
                options.load_slot = Some(slot);
            }
            "--saves" => {
                let dir = args.next().ok_or("Missing directory after --saves")?;
                options.save_dir = PathBuf::from(dir);
            }
            other => return Err(format!("Unknown option '{}'", other)),
        }
    }
    Ok(options)
}

fn print_usage() {
    println!("meguri - Narrative Event Runtime");
    println!();
    println!("USAGE:");
    println!("    cargo run -- play [--debug] [--load <slot>] [--saves <dir>]");
    println!();
    println!("COMMANDS:");
    println!("    play          Play the demo story in CUI player mode");
    println!("    --help, -h    Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --debug           Show debug information and runtime logs");
    println!("    --load <slot>     Continue from a save slot");
    println!("    --saves <dir>     Directory for save slots (default: saves)");
    println!();
    println!("EXAMPLES:");
    println!("    cargo run -- play");
    println!("    cargo run -- play --debug --load 1");
}
