//! Configuration sections for the actuator controllers.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Numeric parameters are checked against `consts` ceilings in `validate()`.
//! Every field has a default so a section may be omitted entirely.

use serde::{Deserialize, Serialize};

use super::gain::Rational;
use crate::consts::{
    BRAKE_CURRENT_MAX_MA, CHARGE_CURRENT_MAX_MA, GEAR_POLES, MOTOR_CURRENT_MAX_MA, MOTOR_RPM_MAX,
    SMA_CURRENT_MAX_MA,
};

// ─── Motor ──────────────────────────────────────────────────────────

/// Default proportional gain: 1/2 mA per rpm.
pub const DEFAULT_KP: Rational = Rational::constant(1, 2);

/// Default integral gain: 1/20 mA per rpm·period.
pub const DEFAULT_KI: Rational = Rational::constant(1, 20);

/// BLDC drive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Tachometer pulses per revolution.
    pub gear_poles: u32,
    /// Initial drive current ceiling [mA].
    pub max_current_ma: u32,
    /// Control loop period [ms].
    pub control_period_ms: u32,
    /// Speed error counted as settled [rpm].
    pub stable_tolerance_rpm: u32,
    /// Consecutive settled control periods required for `MotorStabilized`.
    pub settle_samples: u32,
    /// Stabilization watchdog [ms].
    pub stabilize_timeout_ms: u32,
    /// Integral accumulator clamp [rpm·periods].
    pub integral_limit: i64,
    /// Proportional gain [mA/rpm].
    pub kp: Rational,
    /// Integral gain [mA/(rpm·period)].
    pub ki: Rational,
    /// Invert every direction command.
    pub reverse_directions: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            gear_poles: GEAR_POLES,
            max_current_ma: 4000,
            control_period_ms: 10,
            stable_tolerance_rpm: 100,
            settle_samples: 5,
            stabilize_timeout_ms: 3000,
            integral_limit: 200_000,
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
            reverse_directions: false,
        }
    }
}

impl MotorConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.gear_poles == 0 {
            return Err("motor.gear_poles must be nonzero".to_string());
        }
        if self.max_current_ma > MOTOR_CURRENT_MAX_MA {
            return Err(format!(
                "motor.max_current_ma {} exceeds {}",
                self.max_current_ma, MOTOR_CURRENT_MAX_MA
            ));
        }
        if self.control_period_ms == 0 {
            return Err("motor.control_period_ms must be nonzero".to_string());
        }
        if self.settle_samples == 0 {
            return Err("motor.settle_samples must be nonzero".to_string());
        }
        if self.stabilize_timeout_ms < self.control_period_ms.saturating_mul(self.settle_samples) {
            return Err(format!(
                "motor.stabilize_timeout_ms {} shorter than one settle window",
                self.stabilize_timeout_ms
            ));
        }
        if self.integral_limit <= 0 {
            return Err("motor.integral_limit must be positive".to_string());
        }
        Ok(())
    }

    /// Highest speed that can be commanded [rpm].
    pub const fn max_rpm(&self) -> u32 {
        MOTOR_RPM_MAX
    }
}

// ─── SMA ────────────────────────────────────────────────────────────

/// SMA actuator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmaConfig {
    /// Heating current [mA].
    pub retract_current_ma: u32,
    /// Heating time used when a retract passes 0 [ms].
    pub retract_time_ms: u32,
    /// Holding current once retracted [mA].
    pub hold_current_ma: u32,
    /// Cool-down time before reporting extended [ms].
    pub extend_time_ms: u32,
}

impl Default for SmaConfig {
    fn default() -> Self {
        Self {
            retract_current_ma: 1500,
            retract_time_ms: 1000,
            hold_current_ma: 400,
            extend_time_ms: 500,
        }
    }
}

impl SmaConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.retract_current_ma == 0 || self.retract_current_ma > SMA_CURRENT_MAX_MA {
            return Err(format!(
                "sma.retract_current_ma {} out of range [1, {}]",
                self.retract_current_ma, SMA_CURRENT_MAX_MA
            ));
        }
        if self.hold_current_ma > SMA_CURRENT_MAX_MA {
            return Err(format!(
                "sma.hold_current_ma {} exceeds {}",
                self.hold_current_ma, SMA_CURRENT_MAX_MA
            ));
        }
        if self.retract_time_ms == 0 {
            return Err("sma.retract_time_ms must be nonzero".to_string());
        }
        Ok(())
    }
}

// ─── Brake ──────────────────────────────────────────────────────────

/// Mechanical brake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    /// Longest a step may wait for the coil driver [ms].
    pub watchdog_ms: u32,
    /// Invert every step polarity.
    pub reverse_directions: bool,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            watchdog_ms: 50,
            reverse_directions: false,
        }
    }
}

impl BrakeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.watchdog_ms == 0 {
            return Err("brake.watchdog_ms must be nonzero".to_string());
        }
        Ok(())
    }

    /// Coil current ceiling [mA].
    pub const fn max_current_ma(&self) -> u32 {
        BRAKE_CURRENT_MAX_MA
    }
}

// ─── Charge ─────────────────────────────────────────────────────────

/// Charge management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// Charger limit applied on entering Manual [mA].
    pub manual_current_ma: u32,
    /// Charger limit used in Precharge [mA].
    pub precharge_current_ma: u32,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            manual_current_ma: 500,
            precharge_current_ma: 100,
        }
    }
}

impl ChargeConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("charge.manual_current_ma", self.manual_current_ma),
            ("charge.precharge_current_ma", self.precharge_current_ma),
        ] {
            if value > CHARGE_CURRENT_MAX_MA {
                return Err(format!("{name} {value} exceeds {CHARGE_CURRENT_MAX_MA}"));
            }
        }
        Ok(())
    }
}

// ─── Maneuvers ──────────────────────────────────────────────────────

/// Maneuver timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManeuverConfig {
    /// Inertial actuation hold stage duration [ms].
    pub hold_ms: u32,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        Self { hold_ms: 200 }
    }
}

impl ManeuverConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.hold_ms == 0 {
            return Err("maneuver.hold_ms must be nonzero".to_string());
        }
        Ok(())
    }
}
