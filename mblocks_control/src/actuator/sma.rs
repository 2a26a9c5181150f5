//! SMA latch controller.
//!
//! ```text
//!  Extended ──retract──▶ Retracting ──time──▶ Holding
//!     ▲                      │                  │
//!     └──── cool-down ◀── Extending ◀──extend───┘
//! ```
//!
//! `retract` may start from any phase. A refused current write while heating
//! or entering Holding drops the actuator into Extending and reports
//! `SmaExtending` as a fault outcome.

use mblocks_common::actuator::config::SmaConfig;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::actuator::state::SmaPhase;
use mblocks_common::consts::SMA_CURRENT_MAX_MA;
use mblocks_common::hal::types::duty_for_current;
use mblocks_common::hal::{HalError, PwmChannel, PwmDriver};
use tracing::{debug, warn};

/// Running timer, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmaTimer {
    None,
    /// Heating until the deadline, then Holding at `hold_ma`.
    Heat { until_ms: u64, hold_ma: u32 },
    /// Cooling until the deadline, then Extended. `report` is false after a
    /// fault, whose outcome was already produced.
    Cool { until_ms: u64, report: bool },
}

/// SMA actuator state machine.
#[derive(Debug)]
pub struct SmaController {
    config: SmaConfig,
    phase: SmaPhase,
    timer: SmaTimer,
    current_ma: u32,
}

impl SmaController {
    pub fn new(config: SmaConfig) -> Self {
        Self {
            config,
            phase: SmaPhase::Extended,
            timer: SmaTimer::None,
            current_ma: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> SmaPhase {
        self.phase
    }

    /// Heater current currently applied [mA].
    #[inline]
    pub const fn current_ma(&self) -> u32 {
        self.current_ma
    }

    /// Whether an outcome is still owed to a caller.
    #[inline]
    pub fn is_busy(&self) -> bool {
        match self.timer {
            SmaTimer::None => false,
            SmaTimer::Heat { .. } => true,
            SmaTimer::Cool { report, .. } => report,
        }
    }

    /// Relaxed with nothing running.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == SmaPhase::Extended && self.timer == SmaTimer::None
    }

    // ─── Parameters (next actuation only) ───────────────────────────

    #[inline]
    pub const fn retract_current_ma(&self) -> u32 {
        self.config.retract_current_ma
    }

    #[inline]
    pub const fn retract_time_ms(&self) -> u32 {
        self.config.retract_time_ms
    }

    #[inline]
    pub const fn hold_current_ma(&self) -> u32 {
        self.config.hold_current_ma
    }

    #[inline]
    pub const fn extend_time_ms(&self) -> u32 {
        self.config.extend_time_ms
    }

    pub fn set_retract_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        Self::check_heat_current(current_ma)?;
        self.config.retract_current_ma = current_ma;
        Ok(())
    }

    pub fn set_retract_time(&mut self, time_ms: u32) -> Result<(), CommandError> {
        if time_ms == 0 {
            return Err(CommandError::ZeroDuration {
                what: "sma retract_time_ms",
            });
        }
        self.config.retract_time_ms = time_ms;
        Ok(())
    }

    pub fn set_hold_current(&mut self, current_ma: u32) -> Result<(), CommandError> {
        CommandError::check_range(
            "sma hold_current_ma",
            current_ma as i64,
            0,
            SMA_CURRENT_MAX_MA as i64,
        )?;
        self.config.hold_current_ma = current_ma;
        Ok(())
    }

    pub fn set_extend_time(&mut self, time_ms: u32) {
        self.config.extend_time_ms = time_ms;
    }

    fn check_heat_current(current_ma: u32) -> Result<(), CommandError> {
        CommandError::check_range(
            "sma retract current_ma",
            current_ma as i64,
            1,
            SMA_CURRENT_MAX_MA as i64,
        )
    }

    // ─── Primitives ─────────────────────────────────────────────────

    /// Heat at the configured retract current. `time_ms = 0` selects the
    /// configured retract time.
    pub fn retract<H: PwmDriver>(&mut self, hw: &mut H, now_ms: u64, time_ms: u32) -> Result<(), CommandError> {
        self.retract_with_current(hw, now_ms, time_ms, self.config.retract_current_ma)
    }

    /// Heat at `current_ma` for this actuation only.
    pub fn retract_with_current<H: PwmDriver>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
        time_ms: u32,
        current_ma: u32,
    ) -> Result<(), CommandError> {
        Self::check_heat_current(current_ma)?;
        let time_ms = if time_ms == 0 {
            self.config.retract_time_ms
        } else {
            time_ms
        };

        if !self.set_current(hw, current_ma) {
            self.relax(hw, now_ms, false);
            return Err(HalError::PwmRejected(PwmChannel::SmaCurrent).into());
        }
        self.phase = SmaPhase::Retracting;
        self.timer = SmaTimer::Heat {
            until_ms: now_ms + time_ms as u64,
            hold_ma: self.config.hold_current_ma,
        };
        debug!("SMA retracting: {} mA for {} ms", current_ma, time_ms);
        Ok(())
    }

    /// Release the actuator.
    ///
    /// Returns `SmaExtended` at once when already extended. From Extending the
    /// running cool-down is kept and will report to the newest caller.
    pub fn extend<H: PwmDriver>(&mut self, hw: &mut H, now_ms: u64) -> Option<MotionPrimitive> {
        match self.phase {
            SmaPhase::Extended => Some(MotionPrimitive::SmaExtended),
            SmaPhase::Extending => {
                if let SmaTimer::Cool { until_ms, .. } = self.timer {
                    self.timer = SmaTimer::Cool {
                        until_ms,
                        report: true,
                    };
                }
                None
            }
            SmaPhase::Retracting | SmaPhase::Holding => {
                self.relax(hw, now_ms, true);
                debug!("SMA extending");
                None
            }
        }
    }

    // ─── Detection ──────────────────────────────────────────────────

    pub fn poll<H: PwmDriver>(&mut self, hw: &mut H, now_ms: u64) -> Option<MotionPrimitive> {
        match self.timer {
            SmaTimer::Heat { until_ms, hold_ma } => {
                if now_ms < until_ms {
                    return None;
                }
                if !self.set_current(hw, hold_ma) {
                    warn!("SMA hold current refused, relaxing");
                    self.relax(hw, now_ms, false);
                    return Some(MotionPrimitive::SmaExtending);
                }
                self.phase = SmaPhase::Holding;
                self.timer = SmaTimer::None;
                debug!("SMA retracted, holding at {} mA", hold_ma);
                Some(MotionPrimitive::SmaRetracted)
            }
            SmaTimer::Cool { until_ms, report } if now_ms >= until_ms => {
                self.phase = SmaPhase::Extended;
                self.timer = SmaTimer::None;
                debug!("SMA extended");
                report.then_some(MotionPrimitive::SmaExtended)
            }
            SmaTimer::Cool { .. } | SmaTimer::None => None,
        }
    }

    /// Cut the current and start cooling.
    fn relax<H: PwmDriver>(&mut self, hw: &mut H, now_ms: u64, report: bool) {
        if !self.set_current(hw, 0) {
            warn!("SMA current cut refused");
        }
        if self.phase == SmaPhase::Extended && !report {
            // Never heated.
            self.timer = SmaTimer::None;
            return;
        }
        self.phase = SmaPhase::Extending;
        self.timer = SmaTimer::Cool {
            until_ms: now_ms + self.config.extend_time_ms as u64,
            report,
        };
    }

    fn set_current<H: PwmDriver>(&mut self, hw: &mut H, current_ma: u32) -> bool {
        let accepted = hw.set_duty_cycle(PwmChannel::SmaCurrent, duty_for_current(current_ma));
        if accepted {
            self.current_ma = current_ma;
        }
        accepted
    }
}
