//! Charge management state machine.
//!
//! `Off ↔ {Standby, Manual, Precharge, Discharge}`. Moving between two
//! non-Off states must pass through Off; a same-state request is a no-op.
//!
//! | State | Charger | Discharge switches |
//! |-------|---------|--------------------|
//! | Off | disabled | open |
//! | Standby | automatic | open |
//! | Manual | enabled at the manual limit | per mask |
//! | Precharge | enabled at the precharge current | open |
//! | Discharge | disabled | all closed |
//!
//! The charger limit and the switch mask can only be changed in Manual.

use mblocks_common::actuator::config::ChargeConfig;
use mblocks_common::actuator::error::{CommandError, DischargeMask};
use mblocks_common::actuator::state::ChargeState;
use mblocks_common::consts::{CELL_COUNT, CHARGE_CURRENT_MAX_MA};
use mblocks_common::hal::{Charger, ChargerMode, HalError};
use tracing::{debug, info, warn};

/// Result of a charge transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeTransition {
    /// Hardware reconfigured for the new state.
    Ok(ChargeState),
    /// Already in the requested state, nothing touched.
    Unchanged(ChargeState),
}

/// Charge management controller.
#[derive(Debug)]
pub struct ChargeController {
    config: ChargeConfig,
    state: ChargeState,
    current_limit_ma: u32,
    mask: DischargeMask,
    debug_output: bool,
}

impl ChargeController {
    pub fn new(config: ChargeConfig) -> Self {
        Self {
            current_limit_ma: config.manual_current_ma,
            config,
            state: ChargeState::Off,
            mask: DischargeMask::empty(),
            debug_output: false,
        }
    }

    #[inline]
    pub const fn state(&self) -> ChargeState {
        self.state
    }

    /// Manual charger limit [mA].
    #[inline]
    pub const fn charger_current_limit_ma(&self) -> u32 {
        self.current_limit_ma
    }

    /// Switch mask applied in Manual.
    #[inline]
    pub const fn discharge_mask(&self) -> DischargeMask {
        self.mask
    }

    #[inline]
    pub const fn debug_output(&self) -> bool {
        self.debug_output
    }

    /// Request a state change.
    ///
    /// On a hardware error the charger is driven back to Off (best effort)
    /// and the error returned.
    pub fn set_state<H: Charger>(
        &mut self,
        hw: &mut H,
        target: ChargeState,
    ) -> Result<ChargeTransition, CommandError> {
        use ChargeState as S;

        if target == self.state {
            return Ok(ChargeTransition::Unchanged(target));
        }
        if self.state != S::Off && target != S::Off {
            return Err(CommandError::InvalidChargeTransition {
                from: self.state,
                to: target,
            });
        }

        let from = self.state;
        if let Err(e) = self.apply(hw, target) {
            warn!("charge {:?} -> {:?} failed: {}", from, target, e);
            if let Err(off) = self.apply(hw, S::Off) {
                warn!("charger fallback to Off failed: {}", off);
            }
            self.state = S::Off;
            return Err(e.into());
        }
        self.state = target;
        info!("charge state {:?} -> {:?}", from, target);
        Ok(ChargeTransition::Ok(target))
    }

    /// Program the charger for `state`.
    fn apply<H: Charger>(&self, hw: &mut H, state: ChargeState) -> Result<(), HalError> {
        use ChargeState as S;

        match state {
            S::Off => {
                hw.set_mode(ChargerMode::Disabled)?;
                hw.set_discharge_switches(DischargeMask::empty().bits())
            }
            S::Standby => {
                hw.set_discharge_switches(DischargeMask::empty().bits())?;
                hw.set_mode(ChargerMode::Automatic)
            }
            S::Manual => {
                hw.set_current_limit_ma(self.current_limit_ma)?;
                hw.set_discharge_switches(self.mask.bits())?;
                hw.set_mode(ChargerMode::Enabled)
            }
            S::Precharge => {
                hw.set_discharge_switches(DischargeMask::empty().bits())?;
                hw.set_current_limit_ma(self.config.precharge_current_ma)?;
                hw.set_mode(ChargerMode::Enabled)
            }
            S::Discharge => {
                hw.set_mode(ChargerMode::Disabled)?;
                hw.set_discharge_switches(DischargeMask::all().bits())
            }
        }
    }

    fn require_manual(&self, operation: &'static str) -> Result<(), CommandError> {
        if self.state != ChargeState::Manual {
            return Err(CommandError::IllegalChargeState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Change the charger limit. Manual only.
    pub fn set_charger_current_limit<H: Charger>(&mut self, hw: &mut H, limit_ma: u32) -> Result<(), CommandError> {
        self.require_manual("set charger current limit")?;
        CommandError::check_range(
            "charger current_limit_ma",
            limit_ma as i64,
            0,
            CHARGE_CURRENT_MAX_MA as i64,
        )?;
        hw.set_current_limit_ma(limit_ma)?;
        self.current_limit_ma = limit_ma;
        debug!("charger limit {} mA", limit_ma);
        Ok(())
    }

    /// Set every discharge switch at once (one 0/1 value per cell). Manual only.
    pub fn set_discharge_switches<H: Charger>(
        &mut self,
        hw: &mut H,
        cells: &[u8; CELL_COUNT],
    ) -> Result<(), CommandError> {
        self.require_manual("set discharge switches")?;
        let mask = DischargeMask::from_cells(cells)?;
        hw.set_discharge_switches(mask.bits())?;
        self.mask = mask;
        debug!("discharge switches {:?}", mask);
        Ok(())
    }

    /// Switch state as one value per cell, as currently driven.
    pub fn discharge_switches(&self) -> [u8; CELL_COUNT] {
        match self.state {
            ChargeState::Manual => self.mask.cells(),
            ChargeState::Discharge => DischargeMask::all().cells(),
            _ => DischargeMask::empty().cells(),
        }
    }

    /// Allowed in any state.
    pub fn set_debug_output(&mut self, enabled: bool) {
        self.debug_output = enabled;
    }

    // ─── Read-outs ──────────────────────────────────────────────────

    pub fn battery_voltages_mv<H: Charger>(&self, hw: &mut H) -> Result<[u16; CELL_COUNT], CommandError> {
        Ok(hw.cell_voltages_mv()?)
    }

    pub fn input_voltage_mv<H: Charger>(&self, hw: &mut H) -> Result<u16, CommandError> {
        Ok(hw.input_voltage_mv()?)
    }

    pub fn charge_current_ma<H: Charger>(&self, hw: &mut H) -> Result<u32, CommandError> {
        Ok(hw.charge_current_ma()?)
    }
}
