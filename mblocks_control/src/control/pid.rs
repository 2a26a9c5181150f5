//! PI speed controller with a clamped integral accumulator.
//!
//! `out = kp·e + ki·Σe`, each term evaluated as `num·x / den` in `i64`.
//! The accumulator is clamped to `±integral_limit` (anti-windup) and the
//! output to `[0, out_max]`; the drive cannot push negative current.

use mblocks_common::actuator::gain::Rational;

/// Internal state of the speed controller.
///
/// Must be reset whenever a new speed command is armed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// Sum of speed errors [rpm·periods].
    integral: i64,
}

impl PidState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub const fn integral(&self) -> i64 {
        self.integral
    }
}

/// Gains and limits for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    /// Proportional gain [mA/rpm].
    pub kp: Rational,
    /// Integral gain [mA/(rpm·period)].
    pub ki: Rational,
    /// Accumulator clamp.
    pub integral_limit: i64,
    /// Output ceiling [mA].
    pub out_max: i64,
}

/// Compute one control period.
///
/// # Arguments
/// - `error`: target − measured speed [rpm].
///
/// # Returns
/// Drive current [mA], already clamped to `[0, out_max]`.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: i64) -> i64 {
    // ── I term ──────────────────────────────────────────────
    let limit = gains.integral_limit.max(0);
    state.integral = state.integral.saturating_add(error).clamp(-limit, limit);

    // ── Output ──────────────────────────────────────────────
    let raw = gains
        .kp
        .apply(error)
        .saturating_add(gains.ki.apply(state.integral));

    raw.clamp(0, gains.out_max.max(0))
}

// ─── Tests ──────────────────────────────────────────────────────────
