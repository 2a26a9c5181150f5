//! Maneuver orchestration.
//!
//! A maneuver registers the caller's handler under [`Source::Maneuver`] and
//! drives its stages through the same primitive entry points callers use,
//! with [`stage_handler`] as the completion handler of every stage. Exactly
//! one `MotionEvent` reaches the caller per accepted maneuver, unless a newer
//! command supersedes it first.
//!
//! - [`maneuver`]: maneuver parameters, stage sequencing and the stage log

pub mod maneuver;

use mblocks_common::actuator::brake::BrakeProfile;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::{CompletionEvent, MotionEvent, Source, Token};
use mblocks_common::actuator::state::{MotorMode, StageId};
use mblocks_common::hal::Board;
use tracing::{debug, info, warn};

use crate::module::{Handler, Module};
use maneuver::{
    InertialActuation, Maneuver, ManeuverKind, PlaneChange, StageCommand, StageEntry, StageStep, stage_source,
};

impl<B: Board> Module<B> {
    // ─── Public API ─────────────────────────────────────────────────

    /// Reorient by reaction torque: a current ramp or an electric brake stop.
    ///
    /// The electric brake needs a running flywheel. It may take over a
    /// maneuver that is spinning the flywheel; the motor stays powered until
    /// the brake engages.
    ///
    /// The outcome is `PlaneChangeSuccess` or `PlaneChangeFailure`.
    pub fn plane_change(&mut self, params: PlaneChange, handler: Handler<B>) -> Result<Token, CommandError> {
        match params {
            PlaneChange::Accelerate {
                current_ma,
                duration_ms,
                ..
            } => {
                if duration_ms == 0 {
                    return Err(CommandError::ZeroDuration {
                        what: "plane change duration_ms",
                    });
                }
                CommandError::check_range(
                    "plane change current_ma",
                    current_ma as i64,
                    0,
                    self.motor.max_current_ma() as i64,
                )?;
            }
            PlaneChange::ElectricBrake { hold_ms } => {
                if hold_ms == 0 {
                    return Err(CommandError::ZeroDuration {
                        what: "plane change hold_ms",
                    });
                }
                if self.motor.mode() != MotorMode::Running {
                    return Err(CommandError::MotorNotRunning {
                        mode: self.motor.mode(),
                    });
                }
            }
        }
        self.begin_maneuver(ManeuverKind::PlaneChange(params), handler)
    }

    /// Spin the flywheel up, hold the speed, then stop it on the mechanical
    /// brake so the stored momentum moves the module.
    ///
    /// The outcome is `InertialActuationComplete` or
    /// `InertialActuationFailure`.
    pub fn inertial_actuation(
        &mut self,
        params: InertialActuation,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        CommandError::check_range(
            "inertial speed_rpm",
            params.speed_rpm as i64,
            1,
            self.motor.max_rpm() as i64,
        )?;
        BrakeProfile::single(params.brake_current_ma, params.brake_time_ms)?;
        self.begin_maneuver(ManeuverKind::Inertial(params), handler)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    fn begin_maneuver(&mut self, kind: ManeuverKind, handler: Handler<B>) -> Result<Token, CommandError> {
        let keep_motor = matches!(kind, ManeuverKind::PlaneChange(PlaneChange::ElectricBrake { .. }));
        self.teardown_maneuver(keep_motor);
        let token = self.handlers.arm(Source::Maneuver, handler);
        let maneuver = Maneuver::new(kind, token);
        let first = maneuver.stage();
        self.maneuver = Some(maneuver);
        info!("maneuver {:?} started", kind);

        if let Err(e) = self.enter_stage(first) {
            // Nothing was reported yet: the caller sees the rejection only.
            self.handlers.cancel(Source::Maneuver);
            self.safe_state();
            self.maneuver = None;
            self.log_stage(token, StageEntry::Finished(kind.failure()));
            warn!("maneuver {:?} failed to start: {}", kind, e);
            return Err(e);
        }
        Ok(token)
    }

    /// Tear down the maneuver in flight and stop its actuators. With
    /// `keep_motor` the flywheel keeps its drive and only loses its pending
    /// completion.
    fn teardown_maneuver(&mut self, keep_motor: bool) {
        let Some(m) = self.maneuver.take() else {
            return;
        };
        self.handlers.cancel(Source::Maneuver);
        if keep_motor {
            self.release_brake();
            self.handlers.cancel(Source::Motor);
        } else {
            self.safe_state();
        }
        self.log_stage(m.token(), StageEntry::Superseded);
        info!("maneuver {:?} superseded", m.kind());
    }

    /// Release the brake and let the flywheel coast, discarding their
    /// pending completions.
    fn safe_state(&mut self) {
        self.release_brake();
        self.coast_or_brake(false);
    }

    fn enter_stage(&mut self, stage: StageId) -> Result<(), CommandError> {
        let Some(m) = self.maneuver else {
            return Ok(());
        };
        self.log_stage(m.token(), StageEntry::Entered(stage));
        debug!("maneuver stage {:?}", stage);

        let Some(command) = m.kind().command(stage) else {
            warn!("stage {:?} has no primitive in {:?}", stage, m.kind());
            self.finish_maneuver(m.kind().failure());
            return Ok(());
        };
        let started = match command {
            StageCommand::Accel {
                current_ma,
                duration_ms,
                reverse,
            } => self.start_accel(current_ma, duration_ms, reverse, stage_handler::<B>),
            StageCommand::ElectricStop { hold_ms } => {
                let reverse = self.motor.reverse();
                self.start_speed(0, reverse, hold_ms, stage_handler::<B>)
            }
            StageCommand::Speed { rpm, reverse } => self.start_speed(rpm, reverse, 0, stage_handler::<B>),
            StageCommand::HoldSpeed => {
                let hold_ms = self.maneuver_config.hold_ms;
                self.start_hold(hold_ms, stage_handler::<B>)
            }
            StageCommand::Brake { current_ma, time_ms } => {
                let profile = BrakeProfile::single(current_ma, time_ms)?;
                self.start_brake(profile, stage_handler::<B>)
            }
        };
        started.map(|_| ())
    }

    fn finish_maneuver(&mut self, result: MotionEvent) {
        let Some(m) = self.maneuver.take() else {
            return;
        };
        if !result.is_success() {
            self.safe_state();
        }
        self.log_stage(m.token(), StageEntry::Finished(result));
        info!("maneuver {:?} finished: {:?}", m.kind(), result);
        self.post(CompletionEvent::motion(m.token(), result));
    }
}

/// Completion handler of every maneuver stage.
fn stage_handler<B: Board>(module: &mut Module<B>, event: CompletionEvent) {
    let Some(outcome) = event.as_primitive() else {
        return;
    };
    let Some(maneuver) = module.maneuver.as_mut() else {
        debug!("stage outcome {:?} without maneuver", outcome);
        return;
    };
    if event.source != stage_source(maneuver.stage()) {
        warn!(
            "stage {:?} ignoring {:?} from {:?}",
            maneuver.stage(),
            outcome,
            event.source
        );
        return;
    }
    let failure = maneuver.kind().failure();
    match maneuver.handle_outcome(outcome) {
        StageStep::Enter(next) => {
            if let Err(e) = module.enter_stage(next) {
                warn!("maneuver stage {:?} failed to start: {}", next, e);
                module.finish_maneuver(failure);
            }
        }
        StageStep::Finish(result) => module.finish_maneuver(result),
    }
}
