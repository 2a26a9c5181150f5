//! BLDC flywheel motor controller.
//!
//! Modes: `Off → Coasting ↔ {Running, ElectricBraking, Accelerating}`.
//!
//! - **Speed** (`rpm > 0`): closed-loop PI regulation every control period.
//!   Reports `MotorStabilized` once the measured speed stays within tolerance
//!   for `settle_samples` consecutive periods, `MotorTimeout` if that does not
//!   happen within `stabilize_timeout_ms`. Regulation continues afterwards.
//! - **Stop** (`rpm = 0`): free coast (`MotorCoasting`, immediate) or an
//!   electric brake for the hold time followed by a coast (`MotorStopped`).
//! - **Acceleration**: open-loop linear current ramp, then coast
//!   (`MotorAccelComplete`).
//!
//! Every start supersedes whatever primitive was in flight; the superseded
//! primitive never produces an outcome.

use mblocks_common::actuator::config::MotorConfig;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::actuator::gain::{GainKind, Rational};
use mblocks_common::actuator::state::MotorMode;
use mblocks_common::consts::MOTOR_CURRENT_MAX_MA;
use mblocks_common::hal::types::duty_for_current;
use mblocks_common::hal::{BldcBridge, BridgeDrive, HalError, PwmChannel, PwmDriver, Tachometer};
use tracing::{debug, warn};

use crate::control::pid::{PidGains, PidState, pid_compute};
use crate::control::tacho::rpm_from_hz;

/// Open-loop acceleration ramp, present only while `Accelerating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelProfile {
    /// Current reached at the end of the ramp [mA].
    pub current_ma: u32,
    /// Ramp length [ms].
    pub duration_ms: u32,
}

/// Pending primitive, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotorTask {
    Idle,
    Stabilizing { started_ms: u64, settled: u32 },
    Holding { until_ms: u64 },
    BrakeHold { until_ms: u64 },
    Ramp { started_ms: u64 },
}

/// BLDC drive state machine.
#[derive(Debug)]
pub struct MotorController {
    config: MotorConfig,
    mode: MotorMode,
    target_rpm: u32,
    reverse: bool,
    accel: Option<AccelProfile>,
    pid: PidState,
    task: MotorTask,
    next_control_ms: u64,
    drive_current_ma: u32,
    /// Bridge supply requested explicitly; kept until `power_off`.
    power_held: bool,
}

impl MotorController {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            config,
            mode: MotorMode::Off,
            target_rpm: 0,
            reverse: false,
            accel: None,
            pid: PidState::default(),
            task: MotorTask::Idle,
            next_control_ms: 0,
            drive_current_ma: 0,
            power_held: false,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub const fn mode(&self) -> MotorMode {
        self.mode
    }

    /// Commanded speed [rpm].
    #[inline]
    pub const fn target_rpm(&self) -> u32 {
        self.target_rpm
    }

    /// Commanded direction, before the global inversion.
    #[inline]
    pub const fn reverse(&self) -> bool {
        self.reverse
    }

    #[inline]
    pub const fn accel(&self) -> Option<AccelProfile> {
        self.accel
    }

    #[inline]
    pub const fn max_current_ma(&self) -> u32 {
        self.config.max_current_ma
    }

    #[inline]
    pub const fn reverse_directions(&self) -> bool {
        self.config.reverse_directions
    }

    /// Highest speed `set_speed` accepts [rpm].
    #[inline]
    pub const fn max_rpm(&self) -> u32 {
        self.config.max_rpm()
    }

    /// Last current reference written to the bridge [mA].
    #[inline]
    pub const fn drive_current_ma(&self) -> u32 {
        self.drive_current_ma
    }

    /// Whether a primitive is waiting for its outcome.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.task != MotorTask::Idle
    }

    /// Whether the bridge supply was requested explicitly.
    #[inline]
    pub const fn is_power_held(&self) -> bool {
        self.power_held
    }

    /// No pending primitive, no power going into the windings and no
    /// explicit supply request.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.is_busy()
            && !self.power_held
            && matches!(self.mode, MotorMode::Off | MotorMode::Coasting)
    }

    pub const fn gain(&self, kind: GainKind) -> Rational {
        match kind {
            GainKind::Kp => self.config.kp,
            GainKind::Ki => self.config.ki,
        }
    }

    // ─── Configuration ──────────────────────────────────────────────

    /// Set a PID gain. The pair is stored exactly as given.
    pub fn set_gain(&mut self, kind: GainKind, num: i32, den: i32) -> Result<(), CommandError> {
        let gain = Rational::new(num, den)?;
        match kind {
            GainKind::Kp => self.config.kp = gain,
            GainKind::Ki => self.config.ki = gain,
        }
        debug!("motor {:?} = {}", kind, gain);
        Ok(())
    }

    pub fn set_max_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        CommandError::check_range(
            "motor max_current_ma",
            current_ma as i64,
            1,
            MOTOR_CURRENT_MAX_MA as i64,
        )?;
        self.config.max_current_ma = current_ma;
        Ok(())
    }

    /// Invert every subsequent direction command.
    pub fn set_reverse_directions(&mut self, reverse: bool) {
        self.config.reverse_directions = reverse;
    }

    /// Measured shaft speed [rpm].
    pub fn speed_rpm<H: Tachometer>(&self, hw: &mut H) -> u32 {
        rpm_from_hz(hw.frequency_hz(), self.config.gear_poles)
    }

    // ─── Primitives ─────────────────────────────────────────────────

    /// Command a speed.
    ///
    /// `rpm = 0` stops: a free coast when `post_stop_hold_ms = 0` (outcome is
    /// returned immediately), otherwise an electric brake for the hold time.
    pub fn set_speed<H: PwmDriver + BldcBridge>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
        rpm: u32,
        reverse: bool,
        post_stop_hold_ms: u32,
    ) -> Result<Option<MotionPrimitive>, CommandError> {
        CommandError::check_range("speed rpm", rpm as i64, 0, self.config.max_rpm() as i64)?;
        self.supersede();

        if rpm == 0 {
            if post_stop_hold_ms == 0 {
                self.coast(hw);
                return Ok(Some(MotionPrimitive::MotorCoasting));
            }
            self.arm_brake_hold(hw, now_ms, post_stop_hold_ms)?;
            return Ok(None);
        }

        self.power_up(hw)?;
        self.apply_direction(hw, reverse);
        self.pid.reset();
        self.target_rpm = rpm;
        self.arm_drive(hw)?;
        self.mode = MotorMode::Running;
        self.task = MotorTask::Stabilizing {
            started_ms: now_ms,
            settled: 0,
        };
        self.next_control_ms = now_ms;
        debug!("motor running: target {} rpm, reverse={}", rpm, reverse);
        Ok(None)
    }

    /// Ramp the drive current linearly from 0 to `current_ma` over `duration_ms`.
    pub fn set_accel<H: PwmDriver + BldcBridge>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
        current_ma: u32,
        duration_ms: u32,
        reverse: bool,
    ) -> Result<(), CommandError> {
        if duration_ms == 0 {
            return Err(CommandError::ZeroDuration {
                what: "accel duration_ms",
            });
        }
        CommandError::check_range(
            "accel current_ma",
            current_ma as i64,
            0,
            self.config.max_current_ma as i64,
        )?;
        self.supersede();

        self.power_up(hw)?;
        self.apply_direction(hw, reverse);
        self.target_rpm = 0;
        self.arm_drive(hw)?;
        self.mode = MotorMode::Accelerating;
        self.accel = Some(AccelProfile {
            current_ma,
            duration_ms,
        });
        self.task = MotorTask::Ramp { started_ms: now_ms };
        debug!("motor accelerating: {} mA over {} ms", current_ma, duration_ms);
        Ok(())
    }

    /// Keep regulating for `duration_ms`, then report whether the speed held.
    pub fn hold_speed(&mut self, now_ms: u64, duration_ms: u32) -> Result<(), CommandError> {
        if self.mode != MotorMode::Running {
            return Err(CommandError::MotorNotRunning { mode: self.mode });
        }
        if duration_ms == 0 {
            return Err(CommandError::ZeroDuration {
                what: "hold duration_ms",
            });
        }
        self.task = MotorTask::Holding {
            until_ms: now_ms + duration_ms as u64,
        };
        Ok(())
    }

    /// Synchronous stop. Leaves the motor coasting or electric-braking until
    /// the next command. Produces no outcome.
    pub fn stop<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H, use_electric_brake: bool) {
        self.supersede();
        if use_electric_brake && self.power_up(hw).is_ok() {
            self.set_current(hw, 0);
            hw.set_drive(BridgeDrive::Brake);
            self.target_rpm = 0;
            self.mode = MotorMode::ElectricBraking;
            debug!("motor stopped: electric brake");
        } else {
            self.coast(hw);
            debug!("motor stopped: coasting");
        }
    }

    /// Supply the bridge and leave the motor coasting. The supply stays on
    /// until `power_off`. Produces no outcome.
    pub fn power_on<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H) -> Result<(), CommandError> {
        self.supersede();
        self.power_up(hw)?;
        self.coast(hw);
        self.power_held = true;
        debug!("BLDC bridge powered on");
        Ok(())
    }

    /// Coast and remove bridge supply.
    pub fn power_off<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H) {
        self.power_held = false;
        self.coast(hw);
        if hw.is_powered() && !hw.set_powered(false) {
            warn!("BLDC bridge refused power-off");
        }
        self.mode = MotorMode::Off;
    }

    // ─── Detection ──────────────────────────────────────────────────

    /// Advance timers and the control loop. Returns a terminal outcome.
    pub fn poll<H: PwmDriver + BldcBridge + Tachometer>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
    ) -> Option<MotionPrimitive> {
        match self.mode {
            MotorMode::Running => self.regulate(hw, now_ms),
            MotorMode::Accelerating => self.ramp(hw, now_ms),
            MotorMode::ElectricBraking => match self.task {
                MotorTask::BrakeHold { until_ms } if now_ms >= until_ms => {
                    self.coast(hw);
                    debug!("motor electric brake hold finished");
                    Some(MotionPrimitive::MotorStopped)
                }
                _ => None,
            },
            MotorMode::Off | MotorMode::Coasting => None,
        }
    }

    fn regulate<H: PwmDriver + Tachometer>(&mut self, hw: &mut H, now_ms: u64) -> Option<MotionPrimitive> {
        if now_ms < self.next_control_ms {
            return None;
        }
        self.next_control_ms = now_ms + self.config.control_period_ms as u64;

        let measured = self.speed_rpm(hw);
        let error = self.target_rpm as i64 - measured as i64;
        let gains = PidGains {
            kp: self.config.kp,
            ki: self.config.ki,
            integral_limit: self.config.integral_limit,
            out_max: self.config.max_current_ma as i64,
        };
        let current = pid_compute(&mut self.pid, &gains, error) as u32;
        if !self.set_current(hw, current) {
            // Watchdog reports the failure if the loop cannot recover.
            warn!("BLDC current reference {} mA refused", current);
        }

        let within = error.unsigned_abs() <= self.config.stable_tolerance_rpm as u64;
        match self.task {
            MotorTask::Stabilizing {
                started_ms,
                settled,
            } => {
                let settled = if within { settled + 1 } else { 0 };
                if settled >= self.config.settle_samples {
                    self.task = MotorTask::Idle;
                    debug!("motor stabilized at {} rpm", measured);
                    Some(MotionPrimitive::MotorStabilized)
                } else if now_ms.saturating_sub(started_ms) >= self.config.stabilize_timeout_ms as u64 {
                    self.task = MotorTask::Idle;
                    warn!(
                        "motor did not stabilize: {} rpm, target {} rpm",
                        measured, self.target_rpm
                    );
                    Some(MotionPrimitive::MotorTimeout)
                } else {
                    self.task = MotorTask::Stabilizing {
                        started_ms,
                        settled,
                    };
                    None
                }
            }
            MotorTask::Holding { until_ms } if now_ms >= until_ms => {
                self.task = MotorTask::Idle;
                if within {
                    Some(MotionPrimitive::MotorStabilized)
                } else {
                    warn!("motor speed drifted during hold: {} rpm", measured);
                    Some(MotionPrimitive::MotorTimeout)
                }
            }
            _ => None,
        }
    }

    fn ramp<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H, now_ms: u64) -> Option<MotionPrimitive> {
        let (Some(profile), MotorTask::Ramp { started_ms }) = (self.accel, self.task) else {
            return None;
        };
        let elapsed = now_ms.saturating_sub(started_ms);
        if elapsed >= profile.duration_ms as u64 {
            self.coast(hw);
            debug!("motor acceleration complete");
            return Some(MotionPrimitive::MotorAccelComplete);
        }
        let current = (profile.current_ma as u64 * elapsed / profile.duration_ms as u64) as u32;
        if !self.set_current(hw, current) {
            warn!("BLDC ramp current {} mA refused", current);
        }
        None
    }

    // ─── Hardware helpers ───────────────────────────────────────────

    fn supersede(&mut self) {
        if self.task != MotorTask::Idle {
            debug!("motor primitive superseded: {:?}", self.task);
        }
        self.task = MotorTask::Idle;
        self.accel = None;
    }

    fn power_up<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H) -> Result<(), CommandError> {
        if !hw.is_powered() && !hw.set_powered(true) {
            self.coast(hw);
            return Err(HalError::BridgePowerFailed.into());
        }
        if self.mode == MotorMode::Off {
            self.mode = MotorMode::Coasting;
        }
        Ok(())
    }

    fn apply_direction<H: BldcBridge>(&mut self, hw: &mut H, reverse: bool) {
        self.reverse = reverse;
        hw.set_direction(reverse ^ self.config.reverse_directions);
    }

    /// Zero the reference and engage commutation.
    fn arm_drive<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H) -> Result<(), CommandError> {
        if !self.set_current(hw, 0) {
            self.coast(hw);
            return Err(HalError::PwmRejected(PwmChannel::BldcCurrent).into());
        }
        hw.set_drive(BridgeDrive::Run);
        Ok(())
    }

    fn arm_brake_hold<H: PwmDriver + BldcBridge>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
        hold_ms: u32,
    ) -> Result<(), CommandError> {
        self.power_up(hw)?;
        self.set_current(hw, 0);
        hw.set_drive(BridgeDrive::Brake);
        self.target_rpm = 0;
        self.mode = MotorMode::ElectricBraking;
        self.task = MotorTask::BrakeHold {
            until_ms: now_ms + hold_ms as u64,
        };
        debug!("motor electric brake for {} ms", hold_ms);
        Ok(())
    }

    fn coast<H: PwmDriver + BldcBridge>(&mut self, hw: &mut H) {
        self.set_current(hw, 0);
        hw.set_drive(BridgeDrive::Coast);
        self.task = MotorTask::Idle;
        self.accel = None;
        self.target_rpm = 0;
        self.mode = if hw.is_powered() {
            MotorMode::Coasting
        } else {
            MotorMode::Off
        };
    }

    fn set_current<H: PwmDriver>(&mut self, hw: &mut H, current_ma: u32) -> bool {
        let accepted = hw.set_duty_cycle(PwmChannel::BldcCurrent, duty_for_current(current_ma));
        if accepted {
            self.drive_current_ma = current_ma;
        }
        accepted
    }
}
