//! Mechanical brake sequencer.
//!
//! Plays a validated `BrakeProfile` on the coil driver, one step at a time:
//!
//! 1. **Engaging**: offer the step current to the driver until it accepts.
//!    `WouldBlock` is retried; past `watchdog_ms` the run ends in
//!    `BrakeTimeout`. A driver error ends it in `BrakeFailure`.
//! 2. **Driving**: hold the current for the step time, then move on.
//!
//! After the last step the coil is released and `BrakeSuccess` reported.
//! Every terminal path releases the coil.

use mblocks_common::actuator::brake::BrakeProfile;
use mblocks_common::actuator::config::BrakeConfig;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::hal::CoilDriver;
use tracing::{debug, warn};

/// Phase of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Engaging { since_ms: u64 },
    Driving { until_ms: u64 },
}

/// One profile being played.
#[derive(Debug, Clone)]
struct BrakeRun {
    profile: BrakeProfile,
    step: usize,
    /// Polarity inversion captured when the run started.
    invert: bool,
    phase: StepPhase,
}

impl BrakeRun {
    /// Advance as far as `now_ms` allows. Returns the terminal outcome.
    fn advance<H: CoilDriver>(&mut self, hw: &mut H, now_ms: u64, watchdog_ms: u32) -> Option<MotionPrimitive> {
        loop {
            match self.phase {
                StepPhase::Engaging { since_ms } => {
                    let step = self.profile.steps()[self.step];
                    let current = if self.invert {
                        -step.current_ma
                    } else {
                        step.current_ma
                    };
                    match hw.drive(current) {
                        Ok(()) => {
                            debug!("brake step {}: {} mA for {} ms", self.step, current, step.time_ms);
                            self.phase = StepPhase::Driving {
                                until_ms: now_ms + step.time_ms as u64,
                            };
                            return None;
                        }
                        Err(nb::Error::WouldBlock) => {
                            if now_ms.saturating_sub(since_ms) > watchdog_ms as u64 {
                                warn!("brake step {} not accepted within {} ms", self.step, watchdog_ms);
                                return Some(MotionPrimitive::BrakeTimeout);
                            }
                            return None;
                        }
                        Err(nb::Error::Other(e)) => {
                            warn!("brake step {} aborted: {}", self.step, e);
                            return Some(MotionPrimitive::BrakeFailure);
                        }
                    }
                }
                StepPhase::Driving { until_ms } => {
                    if now_ms < until_ms {
                        return None;
                    }
                    self.step += 1;
                    if self.step >= self.profile.len() {
                        return Some(MotionPrimitive::BrakeSuccess);
                    }
                    self.phase = StepPhase::Engaging { since_ms: now_ms };
                }
            }
        }
    }
}

/// Brake coil sequencer.
#[derive(Debug)]
pub struct BrakeSequencer {
    config: BrakeConfig,
    run: Option<BrakeRun>,
}

impl BrakeSequencer {
    pub fn new(config: BrakeConfig) -> Self {
        Self { config, run: None }
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.run.is_some()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.run.is_none()
    }

    /// Index and phase of the step being played.
    pub fn current_step(&self) -> Option<(usize, StepPhase)> {
        self.run.as_ref().map(|r| (r.step, r.phase))
    }

    /// Profile being played.
    pub fn profile(&self) -> Option<&BrakeProfile> {
        self.run.as_ref().map(|r| &r.profile)
    }

    #[inline]
    pub const fn reverse_directions(&self) -> bool {
        self.config.reverse_directions
    }

    /// Invert the polarity of every step of the next profile.
    pub fn set_reverse_directions(&mut self, reverse: bool) {
        self.config.reverse_directions = reverse;
    }

    /// Start playing `profile`. An active run is released and dropped first.
    pub fn actuate<H: CoilDriver>(&mut self, hw: &mut H, now_ms: u64, profile: BrakeProfile) {
        if self.run.take().is_some() {
            hw.release();
            debug!("brake profile superseded");
        }
        debug!("brake profile: {} steps, {} ms", profile.len(), profile.total_time_ms());
        self.run = Some(BrakeRun {
            profile,
            step: 0,
            invert: self.config.reverse_directions,
            phase: StepPhase::Engaging { since_ms: now_ms },
        });
    }

    /// Single-step profile through the same path.
    pub fn actuate_simple<H: CoilDriver>(
        &mut self,
        hw: &mut H,
        now_ms: u64,
        current_ma: i32,
        time_ms: u32,
    ) -> Result<(), CommandError> {
        let profile = BrakeProfile::single(current_ma, time_ms)?;
        self.actuate(hw, now_ms, profile);
        Ok(())
    }

    /// Abort any run and remove coil current. Produces no outcome.
    pub fn release<H: CoilDriver>(&mut self, hw: &mut H) {
        if self.run.take().is_some() {
            debug!("brake run aborted");
        }
        hw.release();
    }

    pub fn poll<H: CoilDriver>(&mut self, hw: &mut H, now_ms: u64) -> Option<MotionPrimitive> {
        let outcome = self.run.as_mut()?.advance(hw, now_ms, self.config.watchdog_ms)?;
        hw.release();
        self.run = None;
        debug!("brake finished: {:?}", outcome);
        Some(outcome)
    }
}
