//! Prelude module for common re-exports.
//!
//! `use mblocks_common::prelude::*;` brings in the types every controller
//! and caller needs without listing individual paths.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, ModuleConfig, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{EVENT_BUS_CAPACITY, GEAR_POLES, MAX_BRAKE_STEPS};

// ─── Actuator Types ─────────────────────────────────────────────────
pub use crate::actuator::brake::{BrakeProfile, BrakeStep};
pub use crate::actuator::error::{CommandError, DischargeMask};
pub use crate::actuator::event::{
    CompletionEvent, EventKind, MotionEvent, MotionPrimitive, Source, Token,
};
pub use crate::actuator::gain::{GainKind, Rational};
pub use crate::actuator::state::{ChargeState, MotorMode, SmaPhase, StageId};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::{Board, HalError};
