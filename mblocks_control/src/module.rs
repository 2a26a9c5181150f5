//! Module context and main-loop pass.
//!
//! `Module` owns the board, every controller, the event bus, the handler
//! registry and the maneuver in flight. Callers start operations through it;
//! each call arms hardware and returns. `service(now_ms)` is one main-loop
//! pass:
//!
//! 1. **Detection**: every controller checks its timers and feedback; a
//!    terminal outcome is posted to the bus tagged with the current token.
//! 2. **Dispatch**: the events pending at the start of the phase are
//!    delivered FIFO to their registered handler, or dropped when stale.
//!    Events posted by handlers wait for the next pass.
//! 3. **Sleep**: with nothing left to do, the motor bridge is powered down
//!    and the auxiliary board put to sleep, once per period of activity.

use heapless::Deque;
use mblocks_common::actuator::brake::BrakeProfile;
use mblocks_common::actuator::config::ManeuverConfig;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::{CompletionEvent, EventKind, MotionPrimitive, Source, Token};
use mblocks_common::actuator::gain::{GainKind, Rational};
use mblocks_common::actuator::state::ChargeState;
use mblocks_common::config::{ConfigError, ModuleConfig};
use mblocks_common::consts::CELL_COUNT;
use mblocks_common::hal::Board;
use tracing::{debug, error, info, warn};

use crate::actuator::brake::BrakeSequencer;
use crate::actuator::motor::MotorController;
use crate::actuator::sma::SmaController;
use crate::event::bus::EventBus;
use crate::event::registry::HandlerRegistry;
use crate::orchestrator::maneuver::{Maneuver, StageEntry, StageLog, StageRecord};
use crate::power::charge::{ChargeController, ChargeTransition};

/// Completion callback. Runs on the main loop, must not block, may start
/// new operations.
pub type Handler<B> = fn(&mut Module<B>, CompletionEvent);

/// Completions kept by [`console_handler`].
pub const CONSOLE_CAPACITY: usize = 32;

/// Handler that reports the outcome on the log and keeps it for inspection.
pub fn console_handler<B: Board>(module: &mut Module<B>, event: CompletionEvent) {
    match event.kind {
        EventKind::Primitive(outcome) if outcome.is_success() => {
            info!("{:?}: {:?}", event.source, outcome)
        }
        EventKind::Motion(outcome) if outcome.is_success() => info!("maneuver: {:?}", outcome),
        EventKind::Primitive(outcome) => warn!("{:?}: {:?}", event.source, outcome),
        EventKind::Motion(outcome) => warn!("maneuver: {:?}", outcome),
    }
    if module.console.is_full() {
        module.console.pop_front();
    }
    let _ = module.console.push_back(event);
}

/// Owned module context.
pub struct Module<B: Board> {
    pub(crate) board: B,
    pub(crate) motor: MotorController,
    pub(crate) sma: SmaController,
    pub(crate) brake: BrakeSequencer,
    pub(crate) charge: ChargeController,
    pub(crate) bus: EventBus,
    pub(crate) handlers: HandlerRegistry<Handler<B>>,
    pub(crate) maneuver: Option<Maneuver>,
    pub(crate) maneuver_config: ManeuverConfig,
    pub(crate) stage_log: StageLog,
    console: Deque<CompletionEvent, CONSOLE_CAPACITY>,
    now_ms: u64,
    asleep: bool,
}

impl<B: Board> Module<B> {
    /// Build the context from a validated configuration.
    pub fn new(board: B, config: &ModuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            board,
            motor: MotorController::new(config.motor.clone()),
            sma: SmaController::new(config.sma.clone()),
            brake: BrakeSequencer::new(config.brake.clone()),
            charge: ChargeController::new(config.charge.clone()),
            bus: EventBus::new(),
            handlers: HandlerRegistry::new(),
            maneuver: None,
            maneuver_config: config.maneuver.clone(),
            stage_log: StageLog::default(),
            console: Deque::new(),
            now_ms: 0,
            asleep: false,
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn board(&self) -> &B {
        &self.board
    }

    #[inline]
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    #[inline]
    pub fn motor(&self) -> &MotorController {
        &self.motor
    }

    #[inline]
    pub fn sma(&self) -> &SmaController {
        &self.sma
    }

    #[inline]
    pub fn brake(&self) -> &BrakeSequencer {
        &self.brake
    }

    #[inline]
    pub fn charge(&self) -> &ChargeController {
        &self.charge
    }

    /// Maneuver in flight.
    #[inline]
    pub fn maneuver(&self) -> Option<&Maneuver> {
        self.maneuver.as_ref()
    }

    #[inline]
    pub fn stage_log(&self) -> &StageLog {
        &self.stage_log
    }

    /// Completions recorded by [`console_handler`], oldest first.
    pub fn console(&self) -> impl Iterator<Item = &CompletionEvent> {
        self.console.iter()
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    /// Events waiting for dispatch.
    #[inline]
    pub fn pending_events(&self) -> usize {
        self.bus.len()
    }

    #[inline]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    #[inline]
    pub const fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Nothing pending, nothing powered.
    pub fn is_idle(&self) -> bool {
        self.bus.is_empty()
            && self.maneuver.is_none()
            && !self.handlers.any_armed()
            && self.motor.is_idle()
            && self.sma.is_idle()
            && self.brake.is_idle()
    }

    // ─── Main Loop ──────────────────────────────────────────────────

    /// One main-loop pass. Returns the number of handlers invoked.
    pub fn service(&mut self, now_ms: u64) -> usize {
        self.now_ms = now_ms;
        self.detect();
        let delivered = self.dispatch();
        self.manage_sleep();
        delivered
    }

    fn detect(&mut self) {
        let now = self.now_ms;
        if let Some(outcome) = self.motor.poll(&mut self.board, now) {
            self.post_outcome(Source::Motor, outcome);
        }
        if let Some(outcome) = self.sma.poll(&mut self.board, now) {
            self.post_outcome(Source::Sma, outcome);
        }
        if let Some(outcome) = self.brake.poll(&mut self.board, now) {
            self.post_outcome(Source::Brake, outcome);
        }
    }

    fn dispatch(&mut self) -> usize {
        let mut delivered = 0;
        for _ in 0..self.bus.len() {
            let Some(event) = self.bus.pop() else {
                break;
            };
            match self.handlers.take(&event) {
                Some(handler) => {
                    debug!("delivering {:?} from {:?}", event.kind, event.source);
                    handler(self, event);
                    delivered += 1;
                }
                None => warn!(
                    "dropping stale {:?} from {:?} (token {})",
                    event.kind, event.source, event.token.0
                ),
            }
        }
        delivered
    }

    fn manage_sleep(&mut self) {
        if self.asleep || !self.is_idle() {
            return;
        }
        self.motor.power_off(&mut self.board);
        self.board.set_sleep(true);
        self.asleep = true;
        info!("module idle, sleeping");
    }

    fn wake(&mut self) {
        if self.asleep {
            self.board.set_sleep(false);
            self.asleep = false;
            info!("module waking");
        }
    }

    pub(crate) fn post(&mut self, event: CompletionEvent) {
        if let Err(e) = self.bus.post(event) {
            error!("{}", e);
        }
    }

    fn post_outcome(&mut self, source: Source, outcome: MotionPrimitive) {
        let token = self.handlers.generation(source);
        self.post(CompletionEvent::primitive(source, token, outcome));
    }

    /// Register the handler of a primitive that a controller just tried to
    /// start. A rejection leaves the previous registration alone; a hardware
    /// refusal has already superseded it and cancels it. Only a primitive
    /// that is still running wakes the module.
    fn arm(
        &mut self,
        source: Source,
        handler: Handler<B>,
        started: Result<Option<MotionPrimitive>, CommandError>,
    ) -> Result<Token, CommandError> {
        match started {
            Ok(immediate) => {
                let token = self.handlers.arm(source, handler);
                match immediate {
                    Some(outcome) => self.post(CompletionEvent::primitive(source, token, outcome)),
                    None => self.wake(),
                }
                Ok(token)
            }
            Err(e @ CommandError::Hardware(_)) => {
                self.handlers.cancel(source);
                warn!("{:?} start failed: {}", source, e);
                Err(e)
            }
            Err(e) => {
                debug!("{:?} command rejected: {}", source, e);
                Err(e)
            }
        }
    }

    // ─── Stage log ──────────────────────────────────────────────────

    pub(crate) fn log_stage(&mut self, maneuver: Token, entry: StageEntry) {
        self.stage_log.push(StageRecord {
            at_ms: self.now_ms,
            maneuver,
            entry,
        });
    }

    /// Forget the maneuver in flight without touching hardware. Used when a
    /// direct command takes over one of its actuators.
    fn drop_maneuver(&mut self) {
        if let Some(m) = self.maneuver.take() {
            self.handlers.cancel(Source::Maneuver);
            self.log_stage(m.token(), StageEntry::Superseded);
            info!("maneuver {:?} superseded by direct command", m.kind());
        }
    }

    // ─── Motor ──────────────────────────────────────────────────────

    /// Command a flywheel speed. See [`MotorController::set_speed`].
    pub fn set_speed(
        &mut self,
        rpm: u32,
        reverse: bool,
        post_stop_hold_ms: u32,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let token = self.start_speed(rpm, reverse, post_stop_hold_ms, handler)?;
        self.drop_maneuver();
        Ok(token)
    }

    /// Linear current ramp, then coast.
    pub fn set_accel(
        &mut self,
        current_ma: u32,
        duration_ms: u32,
        reverse: bool,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let token = self.start_accel(current_ma, duration_ms, reverse, handler)?;
        self.drop_maneuver();
        Ok(token)
    }

    /// Keep the current speed for `duration_ms`. Motor must be Running.
    pub fn hold_speed(&mut self, duration_ms: u32, handler: Handler<B>) -> Result<Token, CommandError> {
        let token = self.start_hold(duration_ms, handler)?;
        self.drop_maneuver();
        Ok(token)
    }

    /// Synchronous stop; any pending motor completion is discarded.
    pub fn stop_motor(&mut self, use_electric_brake: bool) {
        if use_electric_brake {
            self.wake();
        }
        self.coast_or_brake(use_electric_brake);
        self.drop_maneuver();
    }

    /// Switch the bridge supply. Powering on leaves the motor coasting and
    /// keeps the module awake until the supply is switched off again. Either
    /// way any pending motor completion is discarded.
    pub fn set_motor_power(&mut self, on: bool) -> Result<(), CommandError> {
        self.handlers.cancel(Source::Motor);
        if on {
            self.wake();
            if let Err(e) = self.motor.power_on(&mut self.board) {
                warn!("BLDC power-on failed: {}", e);
                self.drop_maneuver();
                return Err(e);
            }
        } else {
            self.motor.power_off(&mut self.board);
        }
        self.drop_maneuver();
        Ok(())
    }

    pub fn set_max_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        self.motor.set_max_current(current_ma)
    }

    pub fn set_motor_reverse_directions(&mut self, reverse: bool) {
        self.motor.set_reverse_directions(reverse);
    }

    pub fn gain(&self, kind: GainKind) -> Rational {
        self.motor.gain(kind)
    }

    pub fn set_gain(&mut self, kind: GainKind, num: i32, den: i32) -> Result<(), CommandError> {
        self.motor.set_gain(kind, num, den)
    }

    /// Measured flywheel speed [rpm].
    pub fn speed_rpm(&mut self) -> u32 {
        self.motor.speed_rpm(&mut self.board)
    }

    pub(crate) fn start_speed(
        &mut self,
        rpm: u32,
        reverse: bool,
        post_stop_hold_ms: u32,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let started = self
            .motor
            .set_speed(&mut self.board, self.now_ms, rpm, reverse, post_stop_hold_ms);
        self.arm(Source::Motor, handler, started)
    }

    pub(crate) fn start_accel(
        &mut self,
        current_ma: u32,
        duration_ms: u32,
        reverse: bool,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let started = self
            .motor
            .set_accel(&mut self.board, self.now_ms, current_ma, duration_ms, reverse)
            .map(|()| None);
        self.arm(Source::Motor, handler, started)
    }

    pub(crate) fn start_hold(&mut self, duration_ms: u32, handler: Handler<B>) -> Result<Token, CommandError> {
        let started = self.motor.hold_speed(self.now_ms, duration_ms).map(|()| None);
        self.arm(Source::Motor, handler, started)
    }

    pub(crate) fn coast_or_brake(&mut self, use_electric_brake: bool) {
        self.handlers.cancel(Source::Motor);
        self.motor.stop(&mut self.board, use_electric_brake);
    }

    // ─── SMA ────────────────────────────────────────────────────────

    pub fn sma_extend(&mut self, handler: Handler<B>) -> Result<Token, CommandError> {
        let started = Ok(self.sma.extend(&mut self.board, self.now_ms));
        self.arm(Source::Sma, handler, started)
    }

    /// Retract for `time_ms` (`0` = configured time) at the configured current.
    pub fn sma_retract(&mut self, time_ms: u32, handler: Handler<B>) -> Result<Token, CommandError> {
        let started = self.sma.retract(&mut self.board, self.now_ms, time_ms).map(|()| None);
        self.arm(Source::Sma, handler, started)
    }

    pub fn sma_retract_with_current(
        &mut self,
        time_ms: u32,
        current_ma: u32,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let started = self
            .sma
            .retract_with_current(&mut self.board, self.now_ms, time_ms, current_ma)
            .map(|()| None);
        self.arm(Source::Sma, handler, started)
    }

    pub fn set_sma_retract_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        self.sma.set_retract_current(current_ma)
    }

    pub fn set_sma_retract_time(&mut self, time_ms: u32) -> Result<(), CommandError> {
        self.sma.set_retract_time(time_ms)
    }

    pub fn set_sma_hold_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        self.sma.set_hold_current(current_ma)
    }

    pub fn set_sma_extend_time(&mut self, time_ms: u32) {
        self.sma.set_extend_time(time_ms);
    }

    // ─── Brake ──────────────────────────────────────────────────────

    /// Play a brake profile. The motor is coasted first.
    pub fn brake_actuate(&mut self, profile: BrakeProfile, handler: Handler<B>) -> Result<Token, CommandError> {
        let token = self.start_brake(profile, handler)?;
        self.drop_maneuver();
        Ok(token)
    }

    /// Single-step profile through [`Self::brake_actuate`].
    pub fn brake_actuate_simple(
        &mut self,
        current_ma: i32,
        time_ms: u32,
        handler: Handler<B>,
    ) -> Result<Token, CommandError> {
        let profile = BrakeProfile::single(current_ma, time_ms)?;
        self.brake_actuate(profile, handler)
    }

    pub fn set_brake_reverse_directions(&mut self, reverse: bool) {
        self.brake.set_reverse_directions(reverse);
    }

    pub(crate) fn start_brake(&mut self, profile: BrakeProfile, handler: Handler<B>) -> Result<Token, CommandError> {
        self.coast_or_brake(false);
        self.brake.actuate(&mut self.board, self.now_ms, profile);
        self.arm(Source::Brake, handler, Ok(None))
    }

    pub(crate) fn release_brake(&mut self) {
        self.handlers.cancel(Source::Brake);
        self.brake.release(&mut self.board);
    }

    // ─── Charge ─────────────────────────────────────────────────────

    pub fn set_charge_state(&mut self, target: ChargeState) -> Result<ChargeTransition, CommandError> {
        self.charge.set_state(&mut self.board, target)
    }

    pub fn set_charger_current_limit(&mut self, limit_ma: u32) -> Result<(), CommandError> {
        self.charge.set_charger_current_limit(&mut self.board, limit_ma)
    }

    pub fn set_discharge_switches(&mut self, cells: &[u8; CELL_COUNT]) -> Result<(), CommandError> {
        self.charge.set_discharge_switches(&mut self.board, cells)
    }

    pub fn set_debug_output(&mut self, enabled: bool) {
        self.charge.set_debug_output(enabled);
    }

    pub fn battery_voltages_mv(&mut self) -> Result<[u16; CELL_COUNT], CommandError> {
        self.charge.battery_voltages_mv(&mut self.board)
    }

    pub fn input_voltage_mv(&mut self) -> Result<u16, CommandError> {
        self.charge.input_voltage_mv(&mut self.board)
    }

    pub fn charge_current_ma(&mut self) -> Result<u32, CommandError> {
        self.charge.charge_current_ma(&mut self.board)
    }
}
