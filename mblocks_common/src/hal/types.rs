//! HAL command types.
//!
//! - `PwmChannel` - Current-reference PWM outputs
//! - `BridgeDrive` - BLDC bridge drive state
//! - `ChargerMode` - Charger operating mode

use crate::consts::{PWM_FULL_SCALE_MA, PWM_TOP};

/// PWM outputs used as current references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PwmChannel {
    /// BLDC controller REF input (drive current limit).
    BldcCurrent = 0,
    /// SMA heater current.
    SmaCurrent = 1,
}

impl PwmChannel {
    pub const COUNT: usize = 2;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Convert a current [mA] to a PWM compare value, saturating at full scale.
#[inline]
pub const fn duty_for_current(current_ma: u32) -> u16 {
    let duty = (current_ma as u64 * PWM_TOP as u64) / PWM_FULL_SCALE_MA as u64;
    if duty > PWM_TOP as u64 {
        PWM_TOP
    } else {
        duty as u16
    }
}

/// Convert a PWM compare value back to current [mA].
#[inline]
pub const fn current_for_duty(duty: u16) -> u32 {
    ((duty as u64 * PWM_FULL_SCALE_MA as u64) / PWM_TOP as u64) as u32
}

/// BLDC bridge drive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BridgeDrive {
    /// Outputs floating.
    #[default]
    Coast,
    /// Commutating at the REF current.
    Run,
    /// Low-side switches on (electric brake).
    Brake,
}

/// Charger operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChargerMode {
    #[default]
    Disabled,
    /// Charger decides on its own.
    Automatic,
    /// Charger on at the programmed current limit.
    Enabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_scales_linearly() {
        assert_eq!(duty_for_current(0), 0);
        assert_eq!(duty_for_current(PWM_FULL_SCALE_MA), PWM_TOP);
        assert_eq!(duty_for_current(PWM_FULL_SCALE_MA / 2), PWM_TOP / 2);
    }

    #[test]
    fn duty_saturates() {
        assert_eq!(duty_for_current(u32::MAX), PWM_TOP);
    }

    #[test]
    fn current_for_duty_inverts_on_grid() {
        assert_eq!(current_for_duty(duty_for_current(4000)), 4000);
    }
}
