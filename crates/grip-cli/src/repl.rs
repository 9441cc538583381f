//! REPL – interactive shell that plays the role of the gesture sensors.
//!
//! Input lines:
//!   left|right <up|down|left|right|near|far>  – inject a gesture
//!   /status                                   – mode, selection, joint angles
//!   /help                                     – show this list
//!   /quit | /exit                             – stop the controller and exit

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use grip_hal::sim::SimHandles;
use grip_runtime::Controller;
use grip_types::{GestureSymbol, SensorSide};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Gesture { side: SensorSide, symbol: GestureSymbol },
    Status,
    Help,
    Quit,
}

/// Parse one input line.  Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let command = match first {
        "/status" => Command::Status,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        side @ ("left" | "right") => {
            let side = if side == "left" {
                SensorSide::Left
            } else {
                SensorSide::Right
            };
            let raw = words
                .next()
                .ok_or_else(|| format!("missing gesture after '{first}'"))?;
            let symbol =
                GestureSymbol::parse(raw).ok_or_else(|| format!("unknown gesture '{raw}'"))?;
            Command::Gesture { side, symbol }
        }
        other => return Err(format!("unknown command '{other}'")),
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected '{extra}'"));
    }
    Ok(Some(command))
}

/// Run the REPL until `/quit`, EOF, Ctrl-C/Ctrl-D or `shutdown` is set.
pub fn run(controller: &Controller, sensors: &SimHandles, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{}: {}", "Cannot open line editor".red(), e);
            return;
        }
    };

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let line = match editor.readline("grip> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        let _ = editor.add_history_entry(line.as_str());

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Gesture { side, symbol })) => {
                let feed = match side {
                    SensorSide::Left => &sensors.left,
                    SensorSide::Right => &sensors.right,
                };
                feed.push(symbol);
                println!("  {} {} {}", "→".dimmed(), side, symbol.to_string().bold());
            }
            Ok(Some(Command::Status)) => cmd_status(controller),
            Ok(Some(Command::Help)) => cmd_help(),
            Ok(Some(Command::Quit)) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.yellow(),
                "/help".bold()
            ),
        }
    }
}

fn cmd_status(controller: &Controller) {
    let snapshot = controller.snapshot();
    println!();
    println!("  Mode      : {}", snapshot.mode.to_string().bold().cyan());
    println!("  Selection : {}", snapshot.selection_index());
    for joint in controller.engine().joints() {
        let range = joint.range();
        let marker = if snapshot.selection == Some(joint.index()) { "▶" } else { " " };
        let moving = if joint.is_moving() { "moving".yellow() } else { "idle".dimmed() };
        println!(
            "  {} [{}] {:<7} {:>4}°  ({}..={})  {}",
            marker.green(),
            joint.index(),
            joint.label(),
            joint.angle(),
            range.min,
            range.max,
            moving
        );
    }
    println!();
}

fn cmd_help() {
    println!();
    println!("{}", "GestureGrip Commands".bold().underline());
    println!("  {}  – inject a gesture", "left|right <up|down|left|right|near|far>".bold().cyan());
    println!("  {}  – mode, selection and joint angles", "/status".bold().cyan());
    println!("  {}  – exit", "/quit  /exit".bold().cyan());
    println!();
    println!("  near/far cycles DIRECT → SELECT → ADJUST.");
    println!("  DIRECT: right = upright, left = downward.");
    println!("  SELECT: up/down picks a joint.  ADJUST: up/down moves it.");
    println!();
}
