//! State machine enums for the actuator controllers.
//!
//! All enums use `#[repr(u8)]` for compact storage in status snapshots.
//! Includes the BLDC drive mode, the SMA phase, the charge state and the
//! maneuver stage identifiers.

use serde::{Deserialize, Serialize};

// ─── BLDC Motor ─────────────────────────────────────────────────────

/// BLDC drive mode.
///
/// `Accelerating` is the only mode carrying an acceleration profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotorMode {
    /// Bridge controller unpowered.
    Off = 0,
    /// Powered, zero current, no electric brake.
    Coasting = 1,
    /// Closed-loop speed regulation.
    Running = 2,
    /// Windings shorted (electric brake).
    ElectricBraking = 3,
    /// Open-loop current ramp.
    Accelerating = 4,
}

impl MotorMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Coasting),
            2 => Some(Self::Running),
            3 => Some(Self::ElectricBraking),
            4 => Some(Self::Accelerating),
            _ => None,
        }
    }

    /// Whether the motor windings carry drive current in this mode.
    #[inline]
    pub const fn is_driven(&self) -> bool {
        matches!(self, Self::Running | Self::Accelerating)
    }
}

impl Default for MotorMode {
    fn default() -> Self {
        Self::Off
    }
}

// ─── SMA Actuator ───────────────────────────────────────────────────

/// SMA actuator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SmaPhase {
    /// Relaxed, no current.
    Extended = 0,
    /// Cooling after current removal.
    Extending = 1,
    /// Heating at retract current.
    Retracting = 2,
    /// Retracted and held at hold current.
    Holding = 3,
}

impl SmaPhase {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Extended),
            1 => Some(Self::Extending),
            2 => Some(Self::Retracting),
            3 => Some(Self::Holding),
            _ => None,
        }
    }

    /// Whether the actuator is carrying current.
    #[inline]
    pub const fn is_energized(&self) -> bool {
        matches!(self, Self::Retracting | Self::Holding)
    }
}

impl Default for SmaPhase {
    fn default() -> Self {
        Self::Extended
    }
}

// ─── Charge Management ──────────────────────────────────────────────

/// Battery charge management state.
///
/// All transitions are externally commanded and pass through `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ChargeState {
    /// Charger disabled, discharge switches open.
    Off = 0,
    /// Charger in automatic mode.
    Standby = 1,
    /// Charger and discharge switches under manual control.
    Manual = 2,
    /// Charger forced on at the precharge current.
    Precharge = 3,
    /// All discharge switches closed.
    Discharge = 4,
}

impl ChargeState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Standby),
            2 => Some(Self::Manual),
            3 => Some(Self::Precharge),
            4 => Some(Self::Discharge),
            _ => None,
        }
    }
}

impl Default for ChargeState {
    fn default() -> Self {
        Self::Off
    }
}

// ─── Maneuvers ──────────────────────────────────────────────────────

/// Stage identifiers of the composite maneuvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StageId {
    /// Plane change by current ramp.
    Accelerate = 0,
    /// Plane change by electric brake stop.
    ElectricBrake = 1,
    /// Inertial actuation: spin up to target speed.
    Spin = 2,
    /// Inertial actuation: hold speed.
    Hold = 3,
    /// Inertial actuation: engage mechanical brake.
    Brake = 4,
}

impl StageId {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Accelerate),
            1 => Some(Self::ElectricBrake),
            2 => Some(Self::Spin),
            3 => Some(Self::Hold),
            4 => Some(Self::Brake),
            _ => None,
        }
    }
}
