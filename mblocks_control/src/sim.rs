//! Software board for development and testing without hardware.
//!
//! `SimBoard` implements every HAL trait the module core consumes. The
//! flywheel is a first-order plant: with the bridge running it converges to
//! `2 rpm/mA` of reference current with a 100 ms time constant, shorted
//! windings stop it in about 20 ms, a free coast decays over seconds.
//! Faults are injected per peripheral through the `set_*` methods.

use mblocks_common::consts::{CELL_COUNT, GEAR_POLES};
use mblocks_common::hal::types::current_for_duty;
use mblocks_common::hal::{
    AuxPower, BldcBridge, BridgeDrive, Charger, ChargerMode, CoilDriver, HalError, PwmChannel, PwmDriver,
    Tachometer,
};
use tracing::trace;

use crate::module::Module;

/// Steady-state speed per mA of drive current [rpm/mA].
pub const RPM_PER_MA: i64 = 2;

const RUN_TAU_MS: i64 = 100;
const BRAKE_TAU_MS: i64 = 20;
const COAST_TAU_MS: i64 = 2000;

/// Simulated flywheel bridge, SMA heater, brake coil, charger and aux board.
#[derive(Debug, Clone)]
pub struct SimBoard {
    // PWM
    duty: [u16; PwmChannel::COUNT],
    pwm_refused: [bool; PwmChannel::COUNT],

    // BLDC bridge and flywheel
    powered: bool,
    power_fails: bool,
    reverse: bool,
    drive: BridgeDrive,
    /// Flywheel speed [milli-rpm].
    speed_mrpm: i64,

    // Brake coil
    coil_current_ma: i32,
    coil_history: Vec<i32>,
    coil_busy: u32,
    coil_fault: bool,

    // Charger
    charger_mode: ChargerMode,
    charger_limit_ma: u32,
    discharge_bits: u8,
    cells_mv: [u16; CELL_COUNT],
    input_mv: u16,
    charge_ma: u32,
    charger_fails: bool,

    // Aux board
    aux_asleep: bool,
    sleep_requests: u32,
    wake_requests: u32,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            duty: [0; PwmChannel::COUNT],
            pwm_refused: [false; PwmChannel::COUNT],
            powered: false,
            power_fails: false,
            reverse: false,
            drive: BridgeDrive::Coast,
            speed_mrpm: 0,
            coil_current_ma: 0,
            coil_history: Vec::new(),
            coil_busy: 0,
            coil_fault: false,
            charger_mode: ChargerMode::Disabled,
            charger_limit_ma: 0,
            discharge_bits: 0,
            cells_mv: [3700; CELL_COUNT],
            input_mv: 5000,
            charge_ma: 0,
            charger_fails: false,
            aux_asleep: false,
            sleep_requests: 0,
            wake_requests: 0,
        }
    }

    /// Advance the plant by `dt_ms` milliseconds.
    pub fn step(&mut self, dt_ms: u32) {
        for _ in 0..dt_ms {
            let (target, tau) = match (self.powered, self.drive) {
                (true, BridgeDrive::Run) => (self.drive_current_ma() as i64 * RPM_PER_MA * 1000, RUN_TAU_MS),
                (true, BridgeDrive::Brake) => (0, BRAKE_TAU_MS),
                _ => (0, COAST_TAU_MS),
            };
            self.speed_mrpm += (target - self.speed_mrpm) / tau;
        }
        trace!("sim flywheel {} rpm", self.speed_rpm());
    }

    // ─── Observation ────────────────────────────────────────────────

    #[inline]
    pub fn duty(&self, channel: PwmChannel) -> u16 {
        self.duty[channel.index()]
    }

    /// Current reference of the BLDC bridge [mA].
    pub fn drive_current_ma(&self) -> u32 {
        current_for_duty(self.duty(PwmChannel::BldcCurrent))
    }

    /// SMA heater current [mA].
    pub fn sma_current_ma(&self) -> u32 {
        current_for_duty(self.duty(PwmChannel::SmaCurrent))
    }

    #[inline]
    pub fn bridge_powered(&self) -> bool {
        self.powered
    }

    #[inline]
    pub fn bridge_drive(&self) -> BridgeDrive {
        self.drive
    }

    /// Direction pin level after the global inversion.
    #[inline]
    pub fn bridge_reverse(&self) -> bool {
        self.reverse
    }

    /// True flywheel speed [rpm].
    pub fn speed_rpm(&self) -> u32 {
        (self.speed_mrpm / 1000).max(0) as u32
    }

    #[inline]
    pub fn coil_current_ma(&self) -> i32 {
        self.coil_current_ma
    }

    /// Every set-point the coil accepted, in order.
    pub fn coil_history(&self) -> &[i32] {
        &self.coil_history
    }

    #[inline]
    pub fn charger_mode(&self) -> ChargerMode {
        self.charger_mode
    }

    #[inline]
    pub fn charger_limit_ma(&self) -> u32 {
        self.charger_limit_ma
    }

    #[inline]
    pub fn discharge_bits(&self) -> u8 {
        self.discharge_bits
    }

    #[inline]
    pub fn aux_asleep(&self) -> bool {
        self.aux_asleep
    }

    /// Number of sleep requests received.
    #[inline]
    pub fn sleep_requests(&self) -> u32 {
        self.sleep_requests
    }

    #[inline]
    pub fn wake_requests(&self) -> u32 {
        self.wake_requests
    }

    // ─── Fault injection ────────────────────────────────────────────

    pub fn set_pwm_refusal(&mut self, channel: PwmChannel, refuse: bool) {
        self.pwm_refused[channel.index()] = refuse;
    }

    pub fn set_bridge_power_failure(&mut self, fail: bool) {
        self.power_fails = fail;
    }

    /// Answer the next `polls` coil writes with `WouldBlock`.
    pub fn set_coil_busy(&mut self, polls: u32) {
        self.coil_busy = polls;
    }

    pub fn set_coil_fault(&mut self, fault: bool) {
        self.coil_fault = fault;
    }

    pub fn set_charger_failure(&mut self, fail: bool) {
        self.charger_fails = fail;
    }

    pub fn set_cell_voltages_mv(&mut self, cells: [u16; CELL_COUNT]) {
        self.cells_mv = cells;
    }

    pub fn set_input_voltage_mv(&mut self, mv: u16) {
        self.input_mv = mv;
    }

    pub fn set_charge_current_ma(&mut self, ma: u32) {
        self.charge_ma = ma;
    }

    fn charger_ok(&self) -> Result<(), HalError> {
        if self.charger_fails {
            Err(HalError::BusTimeout)
        } else {
            Ok(())
        }
    }
}

// ─── HAL traits ─────────────────────────────────────────────────────

impl PwmDriver for SimBoard {
    fn set_duty_cycle(&mut self, channel: PwmChannel, value: u16) -> bool {
        if self.pwm_refused[channel.index()] {
            return false;
        }
        self.duty[channel.index()] = value;
        true
    }
}

impl BldcBridge for SimBoard {
    fn set_powered(&mut self, on: bool) -> bool {
        if self.power_fails {
            return false;
        }
        self.powered = on;
        if !on {
            self.drive = BridgeDrive::Coast;
        }
        true
    }

    fn is_powered(&self) -> bool {
        self.powered
    }

    fn set_direction(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    fn set_drive(&mut self, drive: BridgeDrive) {
        self.drive = drive;
    }
}

impl Tachometer for SimBoard {
    fn frequency_hz(&mut self) -> u32 {
        (self.speed_rpm() as u64 * GEAR_POLES as u64 / 60) as u32
    }
}

impl CoilDriver for SimBoard {
    fn drive(&mut self, current_ma: i32) -> nb::Result<(), HalError> {
        if self.coil_fault {
            return Err(nb::Error::Other(HalError::CoilFault));
        }
        if self.coil_busy > 0 {
            self.coil_busy -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.coil_current_ma = current_ma;
        self.coil_history.push(current_ma);
        Ok(())
    }

    fn release(&mut self) {
        self.coil_current_ma = 0;
    }
}

impl Charger for SimBoard {
    fn set_mode(&mut self, mode: ChargerMode) -> Result<(), HalError> {
        self.charger_ok()?;
        self.charger_mode = mode;
        Ok(())
    }

    fn set_current_limit_ma(&mut self, limit_ma: u32) -> Result<(), HalError> {
        self.charger_ok()?;
        self.charger_limit_ma = limit_ma;
        Ok(())
    }

    fn set_discharge_switches(&mut self, bits: u8) -> Result<(), HalError> {
        self.charger_ok()?;
        self.discharge_bits = bits;
        Ok(())
    }

    fn cell_voltages_mv(&mut self) -> Result<[u16; CELL_COUNT], HalError> {
        self.charger_ok()?;
        Ok(self.cells_mv)
    }

    fn input_voltage_mv(&mut self) -> Result<u16, HalError> {
        self.charger_ok()?;
        Ok(self.input_mv)
    }

    fn charge_current_ma(&mut self) -> Result<u32, HalError> {
        self.charger_ok()?;
        Ok(self.charge_ma)
    }
}

impl AuxPower for SimBoard {
    fn set_sleep(&mut self, asleep: bool) {
        if asleep {
            self.sleep_requests += 1;
        } else {
            self.wake_requests += 1;
        }
        self.aux_asleep = asleep;
    }
}

// ─── Simulated main loop ────────────────────────────────────────────

impl Module<SimBoard> {
    /// Run the main loop for `duration_ms` one-millisecond passes.
    ///
    /// Returns the number of handlers invoked.
    pub fn run_for(&mut self, duration_ms: u64) -> usize {
        let mut delivered = 0;
        for _ in 0..duration_ms {
            delivered += self.tick();
        }
        delivered
    }

    /// Run one-millisecond passes until `done` holds or `max_ms` elapsed.
    ///
    /// Returns whether `done` was reached.
    pub fn run_until<F>(&mut self, max_ms: u64, mut done: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        for _ in 0..max_ms {
            self.tick();
            if done(self) {
                return true;
            }
        }
        false
    }

    fn tick(&mut self) -> usize {
        self.board_mut().step(1);
        let now = self.now_ms() + 1;
        self.service(now)
    }
}
