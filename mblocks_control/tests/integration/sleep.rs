//! Integration test: idle detection and sleep.

use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::actuator::state::{MotorMode, SmaPhase};
use mblocks_common::hal::BridgeDrive;
use mblocks_control::module::console_handler;

use super::{module, primitives};

#[test]
fn idle_module_sleeps_once() {
    let mut m = module();
    m.run_for(50);
    assert!(m.is_asleep());
    assert!(m.board().aux_asleep());
    assert_eq!(m.board().sleep_requests(), 1);
    assert_eq!(m.board().wake_requests(), 0);
}

#[test]
fn command_wakes_and_completion_sleeps_again() {
    let mut m = module();
    m.run_for(10);
    m.set_accel(1000, 40, false, console_handler).unwrap();
    assert!(!m.is_asleep());
    assert_eq!(m.board().wake_requests(), 1);
    assert!(m.board().bridge_powered());

    m.run_for(100);
    assert_eq!(m.console().count(), 1);
    assert!(m.is_asleep());
    assert_eq!(m.board().sleep_requests(), 2);
    assert!(!m.board().bridge_powered());
    assert_eq!(m.motor().mode(), MotorMode::Off);
}

#[test]
fn rejected_command_does_not_wake() {
    let mut m = module();
    m.run_for(10);
    assert!(m.set_accel(1000, 0, false, console_handler).is_err());
    assert!(m.is_asleep());
    assert_eq!(m.board().wake_requests(), 0);
}

#[test]
fn held_sma_keeps_module_awake() {
    let mut m = module();
    m.sma_retract(20, console_handler).unwrap();
    m.run_for(500);
    assert_eq!(m.sma().state(), SmaPhase::Holding);
    assert!(!m.is_asleep());

    m.sma_extend(console_handler).unwrap();
    m.run_for(1000);
    assert_eq!(m.sma().state(), SmaPhase::Extended);
    assert!(m.is_asleep());
}

#[test]
fn electric_stop_wakes_module() {
    let mut m = module();
    m.run_for(10);
    m.stop_motor(true);
    assert!(!m.is_asleep());
    assert_eq!(m.motor().mode(), MotorMode::ElectricBraking);

    // Shorted windings count as powered; the module stays awake.
    m.run_for(100);
    assert!(!m.is_asleep());

    m.stop_motor(false);
    m.run_for(10);
    assert!(m.is_asleep());
}

#[test]
fn already_extended_sma_does_not_wake() {
    let mut m = module();
    m.run_for(10);
    assert_eq!(m.board().sleep_requests(), 1);

    m.sma_extend(console_handler).unwrap();
    assert!(m.is_asleep());
    m.run_for(50);
    assert_eq!(primitives(&m), vec![MotionPrimitive::SmaExtended]);
    assert_eq!(m.board().wake_requests(), 0);
    assert_eq!(m.board().sleep_requests(), 1);
}

#[test]
fn motor_power_holds_module_awake_until_switched_off() {
    let mut m = module();
    m.run_for(10);
    m.set_motor_power(true).unwrap();
    assert!(!m.is_asleep());
    assert!(m.board().bridge_powered());
    assert_eq!(m.motor().mode(), MotorMode::Coasting);

    m.run_for(200);
    assert!(!m.is_asleep());
    assert!(m.board().bridge_powered());

    m.set_motor_power(false).unwrap();
    m.run_for(10);
    assert!(m.is_asleep());
    assert_eq!(m.motor().mode(), MotorMode::Off);
}

#[test]
fn motor_power_off_while_sma_holds() {
    let mut m = module();
    m.sma_retract(20, console_handler).unwrap();
    m.set_speed(2000, false, 0, console_handler).unwrap();
    m.run_for(500);
    assert_eq!(m.sma().state(), SmaPhase::Holding);
    assert_eq!(m.motor().mode(), MotorMode::Running);

    m.set_motor_power(false).unwrap();
    m.run_for(200);
    assert_eq!(m.motor().mode(), MotorMode::Off);
    assert!(!m.board().bridge_powered());
    assert_eq!(m.board().bridge_drive(), BridgeDrive::Coast);
    assert!(!m.is_asleep());
    assert_eq!(
        primitives(&m),
        vec![MotionPrimitive::SmaRetracted, MotionPrimitive::MotorStabilized]
    );
}
