//! Integration test: plane change maneuvers.

use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionEvent;
use mblocks_common::actuator::state::MotorMode;
use mblocks_common::hal::{BridgeDrive, HalError};
use mblocks_control::module::console_handler;
use mblocks_control::orchestrator::maneuver::PlaneChange;

use super::{module, motions, primitives};

fn accel(current_ma: u32, duration_ms: u32, reverse: bool) -> PlaneChange {
    PlaneChange::Accelerate {
        current_ma,
        duration_ms,
        reverse,
    }
}

#[test]
fn accelerate_ramps_then_coasts() {
    let mut m = module();
    m.plane_change(accel(2000, 100, true), console_handler).unwrap();
    assert_eq!(m.motor().mode(), MotorMode::Accelerating);
    assert!(m.board().bridge_reverse());

    m.run_for(50);
    let mid = m.board().drive_current_ma();
    assert!((900..=1100).contains(&mid), "mid-ramp {mid} mA");

    assert!(m.run_until(200, |m| m.console().count() > 0));
    assert_eq!(motions(&m), vec![MotionEvent::PlaneChangeSuccess]);
    assert_eq!(m.board().drive_current_ma(), 0);
    assert_ne!(m.board().bridge_drive(), BridgeDrive::Run);
    assert!(m.board().speed_rpm() > 0);
}

#[test]
fn accelerate_validates_before_acting() {
    let mut m = module();
    let over = m.motor().max_current_ma() + 1;
    assert!(matches!(
        m.plane_change(accel(over, 100, false), console_handler),
        Err(CommandError::OutOfRange { .. })
    ));
    assert!(matches!(
        m.plane_change(accel(1000, 0, false), console_handler),
        Err(CommandError::ZeroDuration { .. })
    ));
    assert!(!m.board().bridge_powered());
    assert!(m.maneuver().is_none());
}

#[test]
fn electric_brake_needs_running_motor() {
    let mut m = module();
    let err = m
        .plane_change(PlaneChange::ElectricBrake { hold_ms: 100 }, console_handler)
        .unwrap_err();
    assert_eq!(err, CommandError::MotorNotRunning { mode: MotorMode::Off });
    m.run_for(100);
    assert_eq!(m.console().count(), 0);
}

#[test]
fn electric_brake_stops_spinning_flywheel() {
    let mut m = module();
    m.set_speed(3000, false, 0, console_handler).unwrap();
    assert!(m.run_until(2000, |m| m.console().count() > 0));
    assert!(m.board().speed_rpm() > 2800);
    m.clear_console();

    m.plane_change(PlaneChange::ElectricBrake { hold_ms: 150 }, console_handler)
        .unwrap();
    assert_eq!(m.board().bridge_drive(), BridgeDrive::Brake);
    assert!(m.run_until(500, |m| m.console().count() > 0));

    assert_eq!(motions(&m), vec![MotionEvent::PlaneChangeSuccess]);
    assert!(primitives(&m).is_empty());
    assert!(m.board().speed_rpm() < 50);
}

#[test]
fn bridge_power_failure_rejects_without_event() {
    let mut m = module();
    m.board_mut().set_bridge_power_failure(true);
    let err = m
        .plane_change(accel(1000, 100, false), console_handler)
        .unwrap_err();
    assert_eq!(err, CommandError::Hardware(HalError::BridgePowerFailed));
    assert!(m.maneuver().is_none());

    m.run_for(200);
    assert_eq!(m.console().count(), 0);
    assert_eq!(m.motor().mode(), MotorMode::Off);
}
