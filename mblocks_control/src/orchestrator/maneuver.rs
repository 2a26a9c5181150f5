//! Maneuver definitions and stage sequencing.
//!
//! A maneuver is a fixed list of stages. Each stage runs one controller
//! primitive; its expected success outcome advances to the next stage, any
//! other outcome ends the maneuver with its failure event. No retries.
//!
//! | Maneuver | Stages | Success | Failure |
//! |----------|--------|---------|---------|
//! | Plane change (accel) | Accelerate | `PlaneChangeSuccess` | `PlaneChangeFailure` |
//! | Plane change (e-brake) | ElectricBrake | `PlaneChangeSuccess` | `PlaneChangeFailure` |
//! | Inertial actuation | Spin → Hold → Brake | `InertialActuationComplete` | `InertialActuationFailure` |

use heapless::Deque;
use mblocks_common::actuator::event::{MotionEvent, MotionPrimitive, Source, Token};
use mblocks_common::actuator::state::StageId;
use mblocks_common::consts::STAGE_LOG_CAPACITY;

// ─── Maneuver Parameters ────────────────────────────────────────────

/// Plane change variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneChange {
    /// Current ramp on the flywheel, reaction torque rolls the module.
    Accelerate {
        current_ma: u32,
        duration_ms: u32,
        reverse: bool,
    },
    /// Electric brake of a spinning flywheel. Requires the motor Running.
    ElectricBrake { hold_ms: u32 },
}

/// Inertial actuation: spin up, hold, then stop the flywheel with the
/// mechanical brake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InertialActuation {
    pub speed_rpm: u32,
    pub reverse: bool,
    /// Brake coil current (sign = polarity) [mA].
    pub brake_current_ma: i32,
    pub brake_time_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverKind {
    PlaneChange(PlaneChange),
    Inertial(InertialActuation),
}

/// Primitive a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCommand {
    Accel {
        current_ma: u32,
        duration_ms: u32,
        reverse: bool,
    },
    ElectricStop {
        hold_ms: u32,
    },
    Speed {
        rpm: u32,
        reverse: bool,
    },
    HoldSpeed,
    /// Coast the motor, then a single brake step.
    Brake {
        current_ma: i32,
        time_ms: u32,
    },
}

impl ManeuverKind {
    pub const fn first_stage(&self) -> StageId {
        match self {
            Self::PlaneChange(PlaneChange::Accelerate { .. }) => StageId::Accelerate,
            Self::PlaneChange(PlaneChange::ElectricBrake { .. }) => StageId::ElectricBrake,
            Self::Inertial(_) => StageId::Spin,
        }
    }

    pub const fn success(&self) -> MotionEvent {
        match self {
            Self::PlaneChange(_) => MotionEvent::PlaneChangeSuccess,
            Self::Inertial(_) => MotionEvent::InertialActuationComplete,
        }
    }

    pub const fn failure(&self) -> MotionEvent {
        match self {
            Self::PlaneChange(_) => MotionEvent::PlaneChangeFailure,
            Self::Inertial(_) => MotionEvent::InertialActuationFailure,
        }
    }

    /// Primitive for `stage`, `None` if the stage is not part of this maneuver.
    pub const fn command(&self, stage: StageId) -> Option<StageCommand> {
        match (self, stage) {
            (
                Self::PlaneChange(PlaneChange::Accelerate {
                    current_ma,
                    duration_ms,
                    reverse,
                }),
                StageId::Accelerate,
            ) => Some(StageCommand::Accel {
                current_ma: *current_ma,
                duration_ms: *duration_ms,
                reverse: *reverse,
            }),
            (Self::PlaneChange(PlaneChange::ElectricBrake { hold_ms }), StageId::ElectricBrake) => {
                Some(StageCommand::ElectricStop { hold_ms: *hold_ms })
            }
            (Self::Inertial(p), StageId::Spin) => Some(StageCommand::Speed {
                rpm: p.speed_rpm,
                reverse: p.reverse,
            }),
            (Self::Inertial(_), StageId::Hold) => Some(StageCommand::HoldSpeed),
            (Self::Inertial(p), StageId::Brake) => Some(StageCommand::Brake {
                current_ma: p.brake_current_ma,
                time_ms: p.brake_time_ms,
            }),
            _ => None,
        }
    }
}

// ─── Stage Sequencing ───────────────────────────────────────────────

/// Primitive source driving `stage`.
pub const fn stage_source(stage: StageId) -> Source {
    match stage {
        StageId::Brake => Source::Brake,
        StageId::Accelerate | StageId::ElectricBrake | StageId::Spin | StageId::Hold => Source::Motor,
    }
}

/// Outcome that lets `stage` advance.
pub const fn expected_outcome(stage: StageId) -> MotionPrimitive {
    match stage {
        StageId::Accelerate => MotionPrimitive::MotorAccelComplete,
        StageId::ElectricBrake => MotionPrimitive::MotorStopped,
        StageId::Spin | StageId::Hold => MotionPrimitive::MotorStabilized,
        StageId::Brake => MotionPrimitive::BrakeSuccess,
    }
}

const fn next_stage(stage: StageId) -> Option<StageId> {
    match stage {
        StageId::Spin => Some(StageId::Hold),
        StageId::Hold => Some(StageId::Brake),
        StageId::Accelerate | StageId::ElectricBrake | StageId::Brake => None,
    }
}

/// What the orchestrator does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    Enter(StageId),
    Finish(MotionEvent),
}

/// One maneuver in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maneuver {
    kind: ManeuverKind,
    stage: StageId,
    token: Token,
}

impl Maneuver {
    pub const fn new(kind: ManeuverKind, token: Token) -> Self {
        Self {
            stage: kind.first_stage(),
            kind,
            token,
        }
    }

    #[inline]
    pub const fn kind(&self) -> ManeuverKind {
        self.kind
    }

    #[inline]
    pub const fn stage(&self) -> StageId {
        self.stage
    }

    /// Token of the caller's registration.
    #[inline]
    pub const fn token(&self) -> Token {
        self.token
    }

    /// Feed the outcome of the current stage.
    pub fn handle_outcome(&mut self, outcome: MotionPrimitive) -> StageStep {
        if outcome != expected_outcome(self.stage) {
            return StageStep::Finish(self.kind.failure());
        }
        match next_stage(self.stage) {
            Some(next) => {
                self.stage = next;
                StageStep::Enter(next)
            }
            None => StageStep::Finish(self.kind.success()),
        }
    }
}

// ─── Stage Log ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEntry {
    Entered(StageId),
    Finished(MotionEvent),
    /// Torn down by a newer command; nothing reported.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRecord {
    pub at_ms: u64,
    pub maneuver: Token,
    pub entry: StageEntry,
}

/// Most recent stage transitions, oldest dropped first.
#[derive(Debug, Default)]
pub struct StageLog {
    records: Deque<StageRecord, STAGE_LOG_CAPACITY>,
}

impl StageLog {
    pub fn push(&mut self, record: StageRecord) {
        if self.records.is_full() {
            self.records.pop_front();
        }
        let _ = self.records.push_back(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageRecord> {
        self.records.iter()
    }

    /// Entries of one maneuver, in order.
    pub fn entries(&self, maneuver: Token) -> impl Iterator<Item = StageEntry> + '_ {
        self.records
            .iter()
            .filter(move |r| r.maneuver == maneuver)
            .map(|r| r.entry)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inertial() -> ManeuverKind {
        ManeuverKind::Inertial(InertialActuation {
            speed_rpm: 3000,
            reverse: false,
            brake_current_ma: 4000,
            brake_time_ms: 100,
        })
    }

    #[test]
    fn inertial_runs_three_stages() {
        let mut m = Maneuver::new(inertial(), Token(1));
        assert_eq!(m.stage(), StageId::Spin);
        assert_eq!(
            m.handle_outcome(MotionPrimitive::MotorStabilized),
            StageStep::Enter(StageId::Hold)
        );
        assert_eq!(
            m.handle_outcome(MotionPrimitive::MotorStabilized),
            StageStep::Enter(StageId::Brake)
        );
        assert_eq!(
            m.handle_outcome(MotionPrimitive::BrakeSuccess),
            StageStep::Finish(MotionEvent::InertialActuationComplete)
        );
    }

    #[test]
    fn timeout_fails_maneuver() {
        let mut m = Maneuver::new(inertial(), Token(1));
        assert_eq!(
            m.handle_outcome(MotionPrimitive::MotorTimeout),
            StageStep::Finish(MotionEvent::InertialActuationFailure)
        );
    }

    #[test]
    fn brake_fault_fails_maneuver() {
        let mut m = Maneuver::new(inertial(), Token(1));
        m.handle_outcome(MotionPrimitive::MotorStabilized);
        m.handle_outcome(MotionPrimitive::MotorStabilized);
        assert_eq!(
            m.handle_outcome(MotionPrimitive::BrakeFailure),
            StageStep::Finish(MotionEvent::InertialActuationFailure)
        );
    }

    #[test]
    fn plane_change_single_stage() {
        let accel = ManeuverKind::PlaneChange(PlaneChange::Accelerate {
            current_ma: 1000,
            duration_ms: 100,
            reverse: true,
        });
        let mut m = Maneuver::new(accel, Token(4));
        assert_eq!(m.stage(), StageId::Accelerate);
        assert_eq!(
            m.handle_outcome(MotionPrimitive::MotorAccelComplete),
            StageStep::Finish(MotionEvent::PlaneChangeSuccess)
        );

        let stop = ManeuverKind::PlaneChange(PlaneChange::ElectricBrake { hold_ms: 50 });
        let mut m = Maneuver::new(stop, Token(5));
        assert_eq!(m.stage(), StageId::ElectricBrake);
        assert_eq!(
            m.handle_outcome(MotionPrimitive::MotorCoasting),
            StageStep::Finish(MotionEvent::PlaneChangeFailure)
        );
    }

    #[test]
    fn commands_match_stages() {
        let kind = inertial();
        assert_eq!(
            kind.command(StageId::Spin),
            Some(StageCommand::Speed {
                rpm: 3000,
                reverse: false
            })
        );
        assert_eq!(kind.command(StageId::Hold), Some(StageCommand::HoldSpeed));
        assert_eq!(
            kind.command(StageId::Brake),
            Some(StageCommand::Brake {
                current_ma: 4000,
                time_ms: 100
            })
        );
        assert_eq!(kind.command(StageId::Accelerate), None);
        assert_eq!(stage_source(StageId::Brake), Source::Brake);
        assert_eq!(stage_source(StageId::Hold), Source::Motor);
    }

    #[test]
    fn stage_log_drops_oldest() {
        let mut log = StageLog::default();
        for n in 0..(STAGE_LOG_CAPACITY as u64 + 3) {
            log.push(StageRecord {
                at_ms: n,
                maneuver: Token(n as u32),
                entry: StageEntry::Entered(StageId::Spin),
            });
        }
        assert_eq!(log.len(), STAGE_LOG_CAPACITY);
        assert_eq!(log.iter().next().map(|r| r.at_ms), Some(3));
        assert_eq!(log.entries(Token(5)).count(), 1);
        assert_eq!(log.entries(Token(0)).count(), 0);
    }
}
