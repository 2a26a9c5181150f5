//! HAL driver traits and error types.
//!
//! This module defines:
//! - `HalError` enum - Error types for driver operations
//! - One narrow trait per peripheral the core consumes
//! - `Board` - the union of all of them, implemented by a board or simulation
//!
//! # Timing Contracts
//!
//! | Operation | Blocking | Notes |
//! |-----------|----------|-------|
//! | `set_duty_cycle()` | no | `false` = channel refused the value |
//! | `frequency_hz()` | no | last completed gate period |
//! | `CoilDriver::drive()` | no | `WouldBlock` while the driver is busy |
//! | `Charger::*` | bounded | bus transactions with an iteration ceiling |

use thiserror::Error;

use super::types::{BridgeDrive, ChargerMode, PwmChannel};
use crate::consts::CELL_COUNT;

/// Error types for HAL operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// PWM peripheral rejected a duty-cycle write.
    #[error("PWM channel {0:?} rejected duty cycle")]
    PwmRejected(PwmChannel),

    /// BLDC controller supply could not be switched.
    #[error("BLDC controller power switch failed")]
    BridgePowerFailed,

    /// Brake coil driver reported a fault (open/short winding, thermal).
    #[error("brake coil driver fault")]
    CoilFault,

    /// Bus transaction did not complete within its iteration ceiling.
    #[error("bus transaction timed out")]
    BusTimeout,
}

/// PWM generator.
pub trait PwmDriver {
    /// Set the compare value of `channel`. Returns `false` if refused.
    fn set_duty_cycle(&mut self, channel: PwmChannel, value: u16) -> bool;
}

/// BLDC bridge controller (supply, direction and drive pins).
pub trait BldcBridge {
    /// Switch the controller supply. Returns `false` on failure.
    fn set_powered(&mut self, on: bool) -> bool;

    /// Whether the controller is currently supplied.
    fn is_powered(&self) -> bool;

    /// Select the commutation direction.
    fn set_direction(&mut self, reverse: bool);

    /// Select coast, run or electric brake.
    fn set_drive(&mut self, drive: BridgeDrive);
}

/// Tachometer frequency counter.
pub trait Tachometer {
    /// Pulse frequency of the last completed gate period [Hz].
    fn frequency_hz(&mut self) -> u32;
}

/// Mechanical brake coil H-bridge.
pub trait CoilDriver {
    /// Drive the coil at `current_ma` (sign = polarity).
    ///
    /// Returns `WouldBlock` while the driver cannot accept a new set-point.
    fn drive(&mut self, current_ma: i32) -> nb::Result<(), HalError>;

    /// Remove coil current.
    fn release(&mut self);
}

/// Battery charger and per-cell discharge switches.
pub trait Charger {
    fn set_mode(&mut self, mode: ChargerMode) -> Result<(), HalError>;

    fn set_current_limit_ma(&mut self, limit_ma: u32) -> Result<(), HalError>;

    /// Bit n closes the discharge switch of cell n+1.
    fn set_discharge_switches(&mut self, bits: u8) -> Result<(), HalError>;

    /// Per-cell voltages [mV].
    fn cell_voltages_mv(&mut self) -> Result<[u16; CELL_COUNT], HalError>;

    /// Charger input voltage [mV].
    fn input_voltage_mv(&mut self) -> Result<u16, HalError>;

    /// Measured charge current [mA].
    fn charge_current_ma(&mut self) -> Result<u32, HalError>;
}

/// Auxiliary board sleep control.
pub trait AuxPower {
    fn set_sleep(&mut self, asleep: bool);
}

/// Every peripheral the module core drives.
pub trait Board: PwmDriver + BldcBridge + Tachometer + CoilDriver + Charger + AuxPower {}

impl<T> Board for T where T: PwmDriver + BldcBridge + Tachometer + CoilDriver + Charger + AuxPower {}
