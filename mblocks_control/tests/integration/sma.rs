//! Integration test: SMA latch.

use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::actuator::state::SmaPhase;
use mblocks_common::hal::types::duty_for_current;
use mblocks_common::hal::{HalError, PwmChannel};
use mblocks_control::module::console_handler;

use super::{module, primitives};

#[test]
fn retract_hold_extend_cycle() {
    let mut m = module();
    m.sma_retract(0, console_handler).unwrap();
    assert_eq!(m.board().sma_current_ma(), 1500);

    m.run_for(999);
    assert_eq!(m.sma().state(), SmaPhase::Retracting);
    m.run_for(1);
    assert_eq!(m.sma().state(), SmaPhase::Holding);
    assert_eq!(m.sma().current_ma(), 400);
    assert_eq!(m.board().duty(PwmChannel::SmaCurrent), duty_for_current(400));

    m.sma_extend(console_handler).unwrap();
    assert_eq!(m.board().sma_current_ma(), 0);
    m.run_for(600);
    assert_eq!(
        primitives(&m),
        vec![MotionPrimitive::SmaRetracted, MotionPrimitive::SmaExtended]
    );
}

#[test]
fn extend_when_extended_completes_on_next_pass() {
    let mut m = module();
    m.sma_extend(console_handler).unwrap();
    assert_eq!(m.console().count(), 0);
    m.run_for(1);
    assert_eq!(primitives(&m), vec![MotionPrimitive::SmaExtended]);
}

#[test]
fn refused_heater_rejects_retract() {
    let mut m = module();
    m.board_mut().set_pwm_refusal(PwmChannel::SmaCurrent, true);
    assert_eq!(
        m.sma_retract(100, console_handler),
        Err(CommandError::Hardware(HalError::PwmRejected(PwmChannel::SmaCurrent)))
    );
    assert_eq!(m.sma().state(), SmaPhase::Extended);
    m.run_for(200);
    assert_eq!(m.console().count(), 0);
}

#[test]
fn refused_hold_current_reports_extending() {
    let mut m = module();
    m.sma_retract(50, console_handler).unwrap();
    m.run_for(20);
    m.board_mut().set_pwm_refusal(PwmChannel::SmaCurrent, true);
    m.run_for(100);
    assert_eq!(primitives(&m), vec![MotionPrimitive::SmaExtending]);
    assert_eq!(m.sma().state(), SmaPhase::Extending);

    // Cool-down finishes silently.
    m.run_for(1000);
    assert_eq!(m.sma().state(), SmaPhase::Extended);
    assert_eq!(m.console().count(), 1);
}

#[test]
fn custom_current_applies_to_one_actuation() {
    let mut m = module();
    m.sma_retract_with_current(50, 2500, console_handler).unwrap();
    assert_eq!(m.board().sma_current_ma(), 2500);
    m.run_for(60);
    m.sma_extend(console_handler).unwrap();
    m.run_for(600);

    m.sma_retract(50, console_handler).unwrap();
    assert_eq!(m.board().sma_current_ma(), 1500);
}

#[test]
fn parameter_setters_validate() {
    let mut m = module();
    assert!(m.set_sma_retract_current(0).is_err());
    assert!(m.set_sma_retract_time(0).is_err());
    assert!(m.set_sma_hold_current(1_000_000).is_err());
    m.set_sma_hold_current(250).unwrap();
    m.set_sma_extend_time(100);

    m.sma_retract(10, console_handler).unwrap();
    m.run_for(20);
    assert_eq!(m.board().sma_current_ma(), 250);
    m.sma_extend(console_handler).unwrap();
    m.run_for(100);
    assert_eq!(m.sma().state(), SmaPhase::Extended);
}
