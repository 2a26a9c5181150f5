//! Completion event payloads.
//!
//! Every initiated primitive or maneuver produces exactly one
//! `CompletionEvent`. The payload is a fixed-size `Copy` record: the source
//! that produced it, the generation token it was armed with, and the outcome.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// Producer of completion events. One handler registration per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Source {
    Motor = 0,
    Sma = 1,
    Brake = 2,
    Maneuver = 3,
}

impl Source {
    /// All sources, in registration table order.
    pub const ALL: [Source; 4] = [Source::Motor, Source::Sma, Source::Brake, Source::Maneuver];

    /// Index into the registration table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Generation token of a handler registration.
///
/// Incremented every time a source arms a new primitive; an event whose
/// token differs from the current registration is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Token(pub u32);

impl Token {
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Outcome of a single actuator primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionPrimitive {
    /// Brake profile completed all steps.
    BrakeSuccess,
    /// Coil driver fault; remaining steps aborted.
    BrakeFailure,
    /// Coil driver did not accept a step within the watchdog window.
    BrakeTimeout,
    /// SMA reached the holding phase.
    SmaRetracted,
    /// SMA retract aborted by a driver fault; actuator is relaxing.
    SmaExtending,
    /// SMA cooled down and is extended.
    SmaExtended,
    /// Motor speed settled at the target.
    MotorStabilized,
    /// Motor speed did not settle within the watchdog window.
    MotorTimeout,
    /// Acceleration ramp finished.
    MotorAccelComplete,
    /// Motor released to coast.
    MotorCoasting,
    /// Electric brake hold finished, motor released.
    MotorStopped,
}

impl MotionPrimitive {
    /// Whether the primitive reached its intended end state.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::BrakeSuccess
                | Self::SmaRetracted
                | Self::SmaExtended
                | Self::MotorStabilized
                | Self::MotorAccelComplete
                | Self::MotorCoasting
                | Self::MotorStopped
        )
    }

    /// Whether the outcome is a watchdog timeout (as opposed to a fault).
    #[inline]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::BrakeTimeout | Self::MotorTimeout)
    }
}

/// Terminal outcome of a composite maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionEvent {
    PlaneChangeSuccess,
    PlaneChangeFailure,
    InertialActuationComplete,
    InertialActuationFailure,
}

impl MotionEvent {
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::PlaneChangeSuccess | Self::InertialActuationComplete)
    }
}

/// Either a primitive or a maneuver outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Primitive(MotionPrimitive),
    Motion(MotionEvent),
}

impl EventKind {
    #[inline]
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Primitive(p) => p.is_success(),
            Self::Motion(m) => m.is_success(),
        }
    }
}

/// One posted completion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub source: Source,
    pub token: Token,
    pub kind: EventKind,
}

impl CompletionEvent {
    pub const fn primitive(source: Source, token: Token, outcome: MotionPrimitive) -> Self {
        Self {
            source,
            token,
            kind: EventKind::Primitive(outcome),
        }
    }

    pub const fn motion(token: Token, outcome: MotionEvent) -> Self {
        Self {
            source: Source::Maneuver,
            token,
            kind: EventKind::Motion(outcome),
        }
    }

    /// The primitive outcome, if this is a primitive event.
    #[inline]
    pub const fn as_primitive(&self) -> Option<MotionPrimitive> {
        match self.kind {
            EventKind::Primitive(p) => Some(p),
            EventKind::Motion(_) => None,
        }
    }

    /// The maneuver outcome, if this is a maneuver event.
    #[inline]
    pub const fn as_motion(&self) -> Option<MotionEvent> {
        match self.kind {
            EventKind::Motion(m) => Some(m),
            EventKind::Primitive(_) => None,
        }
    }
}

// Small enough to copy through the ring without indirection.
const_assert!(core::mem::size_of::<CompletionEvent>() <= 16);
