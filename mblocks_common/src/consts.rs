//! System-wide constants for the MBlocks workspace.
//!
//! Single source of truth for numeric limits and hardware relations.
//! Imported by all crates, never duplicated.

/// Tachometer pulses per revolution of the drivetrain (`rpm = Hz * 60 / 42`).
pub const GEAR_POLES: u32 = 42;

/// Maximum number of steps in one mechanical brake profile.
pub const MAX_BRAKE_STEPS: usize = 8;

/// Number of battery cells (one discharge switch per cell).
pub const CELL_COUNT: usize = 4;

/// Number of independent completion sources (motor, SMA, brake, maneuver).
pub const EVENT_SOURCES: usize = 4;

/// Capacity of the completion event ring.
pub const EVENT_BUS_CAPACITY: usize = 8;

/// Capacity of the maneuver stage transition log.
pub const STAGE_LOG_CAPACITY: usize = 16;

/// Full-scale PWM compare value for all current-reference channels.
pub const PWM_TOP: u16 = 1024;

/// Current [mA] corresponding to a full-scale PWM duty cycle.
pub const PWM_FULL_SCALE_MA: u32 = 8000;

/// Hard ceiling for the BLDC drive current [mA].
pub const MOTOR_CURRENT_MAX_MA: u32 = 6000;

/// Hard ceiling for commanded BLDC speed [rpm].
pub const MOTOR_RPM_MAX: u32 = 20_000;

/// Hard ceiling for SMA heating current [mA].
pub const SMA_CURRENT_MAX_MA: u32 = 3000;

/// Hard ceiling for brake coil current magnitude [mA].
pub const BRAKE_CURRENT_MAX_MA: u32 = 6000;

/// Hard ceiling for the charger current limit [mA].
pub const CHARGE_CURRENT_MAX_MA: u32 = 2000;

/// Default configuration file path used by the binary.
pub const DEFAULT_CONFIG_PATH: &str = "config/mblocks.toml";
