//! # MBlocks Control
//!
//! Runs one module operation on the simulated board and reports its
//! completion events. The main loop ticks every simulated millisecond until
//! the operation terminates or the iteration ceiling is reached.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mblocks_common::actuator::brake::BrakeProfile;
use mblocks_common::actuator::event::EventKind;
use mblocks_common::config::{LogLevel, ModuleConfig};
use mblocks_common::consts::DEFAULT_CONFIG_PATH;
use mblocks_control::config::load_config;
use mblocks_control::module::{Module, console_handler};
use mblocks_control::orchestrator::maneuver::{InertialActuation, PlaneChange};
use mblocks_control::sim::SimBoard;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Iteration ceiling of the simulated main loop [ms].
const MAX_RUN_MS: u64 = 30_000;

/// MBlocks Control: module actuator core on a simulated board
#[derive(Parser, Debug)]
#[command(name = "mblocks_control")]
#[command(author = "MBlocks")]
#[command(version)]
#[command(about = "Drive the MBlocks actuators and maneuvers on a simulated board")]
struct Args {
    /// Path to the module configuration TOML. Falls back to
    /// `config/mblocks.toml` when present, then to the built-in defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Spin up, hold, then stop the flywheel on the mechanical brake.
    Inertial {
        #[arg(long, default_value_t = 3000)]
        rpm: u32,
        #[arg(long)]
        reverse: bool,
        /// Brake coil current, sign selects polarity [mA].
        #[arg(long, default_value_t = 3000, allow_hyphen_values = true)]
        brake_current_ma: i32,
        #[arg(long, default_value_t = 100)]
        brake_time_ms: u32,
    },
    /// Plane change by a linear current ramp.
    PlaneChangeAccel {
        #[arg(long, default_value_t = 2000)]
        current_ma: u32,
        #[arg(long, default_value_t = 200)]
        duration_ms: u32,
        #[arg(long)]
        reverse: bool,
    },
    /// Spin up, then plane change by an electric brake stop.
    PlaneChangeBrake {
        #[arg(long, default_value_t = 3000)]
        rpm: u32,
        #[arg(long, default_value_t = 200)]
        hold_ms: u32,
    },
    /// Command a flywheel speed (0 stops).
    Speed {
        rpm: u32,
        #[arg(long)]
        reverse: bool,
        /// Electric brake hold after a stop [ms].
        #[arg(long, default_value_t = 0)]
        hold_ms: u32,
    },
    /// Supply the BLDC bridge for a while, then switch it off.
    MotorPower {
        #[arg(long, default_value_t = 100)]
        on_ms: u32,
        /// Drive current ceiling to apply first [mA].
        #[arg(long)]
        max_current_ma: Option<u32>,
    },
    /// Retract the SMA latch, then release it.
    SmaRetract {
        /// Heating time, 0 = configured [ms].
        #[arg(long, default_value_t = 0)]
        time_ms: u32,
        #[arg(long)]
        current_ma: Option<u32>,
    },
    /// Play a brake profile: "<count> <current_ma> <time_ms> ...".
    Brake {
        #[arg(allow_hyphen_values = true)]
        profile: String,
    },
}

fn main() {
    let args = Args::parse();
    let config_path = args.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    });
    let loaded = load_config(config_path.as_deref());
    let log_level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("MBlocks Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    match result {
        Ok(true) => info!("Operation complete"),
        Ok(false) => {
            warn!("Operation did not succeed");
            process::exit(1);
        }
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    }
}

/// Run the requested command. Returns whether every outcome was a success.
fn run(args: &Args, config: &ModuleConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let mut module = Module::new(SimBoard::new(), config)?;
    info!("Module '{}' ready", config.shared.service_name);

    match &args.command {
        Command::Inertial {
            rpm,
            reverse,
            brake_current_ma,
            brake_time_ms,
        } => {
            module.inertial_actuation(
                InertialActuation {
                    speed_rpm: *rpm,
                    reverse: *reverse,
                    brake_current_ma: *brake_current_ma,
                    brake_time_ms: *brake_time_ms,
                },
                console_handler,
            )?;
            wait_for_events(&mut module, 1)?;
        }
        Command::PlaneChangeAccel {
            current_ma,
            duration_ms,
            reverse,
        } => {
            module.plane_change(
                PlaneChange::Accelerate {
                    current_ma: *current_ma,
                    duration_ms: *duration_ms,
                    reverse: *reverse,
                },
                console_handler,
            )?;
            wait_for_events(&mut module, 1)?;
        }
        Command::PlaneChangeBrake { rpm, hold_ms } => {
            module.set_speed(*rpm, false, 0, console_handler)?;
            wait_for_events(&mut module, 1)?;
            module.plane_change(PlaneChange::ElectricBrake { hold_ms: *hold_ms }, console_handler)?;
            wait_for_events(&mut module, 2)?;
        }
        Command::Speed {
            rpm,
            reverse,
            hold_ms,
        } => {
            module.set_speed(*rpm, *reverse, *hold_ms, console_handler)?;
            wait_for_events(&mut module, 1)?;
            info!("Flywheel at {} rpm", module.speed_rpm());
        }
        Command::MotorPower { on_ms, max_current_ma } => {
            if let Some(limit) = max_current_ma {
                module.set_max_current(*limit)?;
            }
            module.set_motor_power(true)?;
            module.run_for(*on_ms as u64);
            info!(
                "Bridge powered={}, motor {:?}",
                module.board().bridge_powered(),
                module.motor().mode()
            );
            module.set_motor_power(false)?;
            module.run_for(1);
            info!(
                "Bridge powered={}, asleep={}",
                module.board().bridge_powered(),
                module.is_asleep()
            );
        }
        Command::SmaRetract { time_ms, current_ma } => {
            match current_ma {
                Some(current) => module.sma_retract_with_current(*time_ms, *current, console_handler)?,
                None => module.sma_retract(*time_ms, console_handler)?,
            };
            wait_for_events(&mut module, 1)?;
            module.sma_extend(console_handler)?;
            wait_for_events(&mut module, 2)?;
        }
        Command::Brake { profile } => {
            let profile = BrakeProfile::parse(profile)?;
            module.brake_actuate(profile, console_handler)?;
            wait_for_events(&mut module, 1)?;
        }
    }

    let mut all_ok = true;
    for event in module.console() {
        let ok = event.kind.is_success();
        all_ok &= ok;
        match event.kind {
            EventKind::Primitive(p) => info!("{:?} -> {:?} (ok={})", event.source, p, ok),
            EventKind::Motion(m) => info!("maneuver -> {:?} (ok={})", m, ok),
        }
    }
    Ok(all_ok)
}

/// Tick the main loop until `count` completions were recorded.
fn wait_for_events(module: &mut Module<SimBoard>, count: usize) -> Result<(), String> {
    if module.run_until(MAX_RUN_MS, |m| m.console().count() >= count) {
        Ok(())
    } else {
        Err(format!("no completion within {MAX_RUN_MS} ms"))
    }
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
