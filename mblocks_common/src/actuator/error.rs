//! Rejection errors and discharge-switch flags.
//!
//! A `CommandError` is the synchronous *Rejected* outcome: the operation
//! had no side effect and the controller state is unchanged. Asynchronous
//! faults and timeouts are reported as completion events instead.

use bitflags::bitflags;
use thiserror::Error;

use super::state::{ChargeState, MotorMode, SmaPhase};
use crate::consts::CELL_COUNT;
use crate::hal::HalError;

/// Synchronous rejection of an actuator or charge command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Numeric argument outside its permitted range.
    #[error("{what} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A duration that must be nonzero was zero.
    #[error("{what} must be nonzero")]
    ZeroDuration { what: &'static str },

    /// Rational gain with a zero denominator.
    #[error("gain denominator must be nonzero")]
    ZeroDenominator,

    /// Brake profile supplied fewer (or more) steps than it declared.
    #[error("brake profile declares {declared} steps but {supplied} were supplied")]
    StepCountMismatch { declared: usize, supplied: usize },

    /// Brake profile declared more steps than the sequencer holds.
    #[error("brake profile declares {declared} steps, maximum is {max}")]
    TooManySteps { declared: usize, max: usize },

    /// Brake profile text with tokens that do not form a step.
    #[error("brake profile has malformed trailing tokens")]
    MalformedProfile,

    /// Brake profile with no steps.
    #[error("brake profile is empty")]
    EmptyProfile,

    /// Charge mutation attempted outside `Manual`.
    #[error("{operation} not permitted in charge state {state:?}")]
    IllegalChargeState {
        operation: &'static str,
        state: ChargeState,
    },

    /// Charge transition between two non-`Off` states.
    #[error("charge transition {from:?} -> {to:?} must pass through Off")]
    InvalidChargeTransition { from: ChargeState, to: ChargeState },

    /// Discharge switch value other than 0 or 1.
    #[error("discharge switch value {value} for cell {cell} is not 0 or 1")]
    InvalidSwitchValue { cell: usize, value: u8 },

    /// Operation requires a motor mode that is not active.
    #[error("motor is {mode:?}, operation requires Running")]
    MotorNotRunning { mode: MotorMode },

    /// SMA operation not possible in the current phase.
    #[error("SMA is {phase:?}")]
    SmaBusy { phase: SmaPhase },

    /// Hardware refused the command while arming; actuator returned to safe state.
    #[error("hardware: {0}")]
    Hardware(#[from] HalError),
}

impl CommandError {
    /// Range check helper used by all setters.
    pub fn check_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<(), Self> {
        if value < min || value > max {
            Err(Self::OutOfRange {
                what,
                value,
                min,
                max,
            })
        } else {
            Ok(())
        }
    }
}

bitflags! {
    /// Per-cell battery discharge switches (bit n = cell n+1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DischargeMask: u8 {
        const CELL1 = 0x01;
        const CELL2 = 0x02;
        const CELL3 = 0x04;
        const CELL4 = 0x08;
    }
}

impl DischargeMask {
    /// Build a mask from one value per cell.
    ///
    /// Every value must be 0 or 1; any other value rejects the whole write.
    pub fn from_cells(cells: &[u8; CELL_COUNT]) -> Result<Self, CommandError> {
        let mut bits = 0u8;
        for (cell, &value) in cells.iter().enumerate() {
            match value {
                0 => {}
                1 => bits |= 1 << cell,
                _ => return Err(CommandError::InvalidSwitchValue { cell, value }),
            }
        }
        Ok(Self::from_bits_truncate(bits))
    }

    /// One value (0/1) per cell.
    pub fn cells(&self) -> [u8; CELL_COUNT] {
        let mut out = [0u8; CELL_COUNT];
        for (cell, slot) in out.iter_mut().enumerate() {
            *slot = (self.bits() >> cell) & 1;
        }
        out
    }
}
