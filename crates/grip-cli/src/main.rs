//! `gesture-grip` – GestureGrip command line interface.
//!
//! This binary:
//!
//! 1. Loads `~/.gesture-grip/config.toml` (writing the defaults on first run).
//! 2. Builds simulated servos, gesture sensors and a status LED.
//! 3. Brings the arm up through the [`Controller`] startup sequence.
//! 4. Drops the user into a REPL that injects gestures into the sensors.
//! 5. On `/quit`, EOF or Ctrl-C stops every task and all motion.

mod config;
mod repl;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use grip_hal::sim::SimRegistry;
use grip_runtime::Controller;
use grip_runtime::telemetry::init_tracing;
use tracing::{error, warn};

fn main() -> ExitCode {
    let _telemetry = init_tracing("gesture-grip");

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the arm …".yellow().bold());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let path = config::config_path();
    let cfg = match config::load_or_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::GripConfig::default()
        }
    };
    if path.exists() {
        println!("  Config loaded from {}", path.display().to_string().bold());
    } else {
        match config::save(&cfg) {
            Ok(()) => println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        }
    }
    let controller_config = match cfg.to_controller_config() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // ── Hardware + controller ─────────────────────────────────────────────
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let (registry, sensors) = SimRegistry::new()
        .with_joints(cfg.joints.iter().map(|j| j.label.clone()))
        .with_indicator()
        .build();

    println!("\n  Bringing the arm to its upright posture …");
    let controller = match runtime.block_on(Controller::start(registry, controller_config)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "startup failed");
            println!("{} {}", "✗ Startup failed:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    println!("  {} Arm ready.", "✓".green().bold());
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    // Runs on the main thread; the controller tasks live on the runtime's
    // worker threads.
    repl::run(&controller, &sensors, Arc::clone(&shutdown));

    runtime.block_on(controller.shutdown());
    println!("{}", "  ✓ Arm stopped.".green());
    ExitCode::SUCCESS
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___         _                  ___      _      "#.bold().cyan());
    println!("{}", r#"  / __|___ ___| |_ _  _ _ _ ___  / __|_ _ (_)_ __ "#.bold().cyan());
    println!("{}", r#" | (_ / -_|_-<  _| || | '_/ -_)| (_ | '_|| | '_ \"#.bold().cyan());
    println!("{}", r#"  \___\___/__/\__|\_,_|_| \___| \___|_|  |_| .__/"#.bold().cyan());
    println!("{}", r#"                                           |_|   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "GestureGrip".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Gesture-controlled robotic arm");
    println!();
}
