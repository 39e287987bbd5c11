//! `fetchbot` – operator console for the fetch robot.
//!
//! 1. Initialises tracing and loads `~/.fetchbot/config.toml` (written with
//!    defaults on first run).
//! 2. Runs the power-on sequence and starts the sensor poller thread.
//! 3. Reads directive payloads, one JSON object per line, from stdin.  Lines
//!    starting with `sim` steer the simulated sensors instead.
//! 4. Ctrl-C stops the drive and ends the session; so does end of input.

mod config;
mod console;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::{error, warn};

use fetchbot_hal::{Hardware, SimRobot};
use fetchbot_kernel::{Clock, SystemClock, mode_channel};
use fetchbot_middleware::{EventBus, LineTransport, Topic, TopicReceiver, TransportEvent};
use fetchbot_runtime::{BehaviorMachine, Dispatcher, SensorPoller, init_tracing};
use fetchbot_types::{Event, EventPayload};

use console::ConsoleLine;

fn main() -> ExitCode {
    let _telemetry = init_tracing("fetchbot");
    print_banner();

    let cfg = load_config();

    let sim = Arc::new(SimRobot::headless());
    let hw = Hardware::new(sim.clone(), sim.clone());
    let (arm, clear) = mode_channel();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let bus = EventBus::default();
    let mut behavior_events = bus.subscribe_to(Topic::Behavior);
    let mut alerts = bus.subscribe_to(Topic::Alerts);

    let dispatcher = Dispatcher::new(
        hw.clone(),
        arm,
        Arc::clone(&clock),
        cfg.behavior.clone(),
        bus.clone(),
    );
    if let Err(e) = dispatcher.startup() {
        println!("{}: {e}", "Startup failed".red());
        return ExitCode::FAILURE;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let machine = BehaviorMachine::new(hw.clone(), clear, clock, cfg.behavior, bus);
    let poller = match SensorPoller::new(machine).spawn(Arc::clone(&shutdown)) {
        Ok(handle) => handle,
        Err(e) => {
            println!("{}: {e}", "Could not start sensor poller".red());
            return ExitCode::FAILURE;
        }
    };

    install_ctrlc(hw, Arc::clone(&shutdown));

    println!(
        "  Send directives as JSON lines, e.g. {}",
        r#"{"type":"come"}"#.bold().cyan()
    );
    println!(
        "  Steer sensors with {}\n",
        "sim distance|angle|touch <value>".bold().cyan()
    );

    let stdin = io::stdin();
    for event in LineTransport::new(stdin.lock()) {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match event {
            Ok(TransportEvent::Connected) => report_hook("connect", dispatcher.on_connected()),
            Ok(TransportEvent::Disconnected) => {
                report_hook("disconnect", dispatcher.on_disconnected())
            }
            Ok(TransportEvent::Payload(line)) => handle_line(&line, &sim, &dispatcher),
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        }
        print_events(&mut behavior_events, &mut alerts);
    }

    shutdown.store(true, Ordering::SeqCst);
    report_hook("shutdown", dispatcher.shutdown());

    let status = match poller.join() {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(fault)) => {
            println!("{}: {fault}", "Robot halted".red().bold());
            ExitCode::FAILURE
        }
        Err(_) => {
            println!("{}", "Sensor poller panicked".red().bold());
            ExitCode::FAILURE
        }
    };
    print_events(&mut behavior_events, &mut alerts);
    status
}

fn load_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {e}", "Error saving config".red()),
            }
            with_env(cfg)
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            with_env(config::Config::default())
        }
    }
}

fn with_env(mut cfg: config::Config) -> config::Config {
    config::apply_env_overrides(&mut cfg);
    match cfg.behavior.validate() {
        Ok(()) => cfg,
        Err(e) => {
            println!("{}: {e}", "Ignoring FETCHBOT_* overrides".red());
            config::Config::default()
        }
    }
}

fn install_ctrlc(hw: Hardware, shutdown: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received, stopping the robot …".yellow().bold());
        if let Err(e) = hw.actuators().drive_stop() {
            println!("{}: {e}", "Drive stop failed".red());
        }
        shutdown.store(true, Ordering::SeqCst);
        println!("{}", "  Press Enter or Ctrl-D to exit.".dimmed());
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }
}

fn handle_line(line: &str, sim: &SimRobot, dispatcher: &Dispatcher) {
    match console::parse(line) {
        Ok(ConsoleLine::Sim(input)) => {
            input.apply(sim);
            println!("  {} {input:?}", "sim".dimmed());
        }
        Ok(ConsoleLine::Directive(payload)) => {
            match dispatcher.handle_payload(payload.as_bytes()) {
                Ok(outcome) => println!("  {} {outcome:?}", "✓".green().bold()),
                // Already logged and published by the dispatcher.
                Err(e) => println!("  {} {e}", "✗".red().bold()),
            }
        }
        Err(usage) => println!("  {}", usage.yellow()),
    }
}

fn report_hook(name: &str, result: Result<(), fetchbot_types::FetchError>) {
    if let Err(e) = result {
        println!("{} ({name}): {e}", "Hardware error".red());
    }
}

fn print_events(behavior: &mut TopicReceiver, alerts: &mut TopicReceiver) {
    for Event { payload, .. } in behavior.drain() {
        println!("  {} {}", "•".cyan(), describe(&payload));
    }
    for Event { payload, .. } in alerts.drain() {
        if let EventPayload::Fault { .. } = payload {
            println!("  {} {}", "!".red().bold(), describe(&payload));
        }
    }
}

fn describe(payload: &EventPayload) -> String {
    match payload {
        EventPayload::ModeArmed(mode) => format!("{mode} armed"),
        EventPayload::ModeCleared(mode) => format!("{mode} finished"),
        EventPayload::TurnCompleted { angle_deg } => format!("turn completed at {angle_deg:.1}°"),
        EventPayload::ProximityBreached { mode, distance_cm } => {
            format!("{mode}: target at {distance_cm:.0} cm")
        }
        EventPayload::DirectiveRejected { reason } => format!("rejected: {reason}"),
        EventPayload::Fault { component, message } => format!("fault on {component}: {message}"),
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"    ___    __       __    __        __ "#.bold().cyan());
    println!("{}", r#"   / _/__ / /_____/ /   / /  ___  / /_"#.bold().cyan());
    println!("{}", r#"  / _/ -_) __/ __/ _ \ / _ \/ _ \/ __/"#.bold().cyan());
    println!("{}", r#" /_/ \__/\__/\__/_//_//_.__/\___/\__/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "fetchbot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Come, take, bring.");
    println!();
}
