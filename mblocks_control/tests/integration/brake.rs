//! Integration test: mechanical brake profiles.

use mblocks_common::actuator::brake::BrakeProfile;
use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::event::MotionPrimitive;
use mblocks_common::actuator::state::MotorMode;
use mblocks_control::module::console_handler;

use super::{module, primitives};

#[test]
fn short_profile_is_rejected_before_anything_moves() {
    let mut m = module();
    let err = BrakeProfile::parse("3 2000 20 -1000 10").unwrap_err();
    assert_eq!(
        err,
        CommandError::StepCountMismatch {
            declared: 3,
            supplied: 2
        }
    );
    assert!(m.brake().is_idle());
    m.run_for(50);
    assert!(m.board().coil_history().is_empty());
}

#[test]
fn profile_plays_steps_in_order() {
    let mut m = module();
    let profile = BrakeProfile::parse("3 3000 20 -1500 10 500 5").unwrap();
    m.brake_actuate(profile, console_handler).unwrap();

    assert!(m.run_until(200, |m| m.console().count() > 0));
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeSuccess]);
    assert_eq!(m.board().coil_history(), &[3000, -1500, 500]);
    assert_eq!(m.board().coil_current_ma(), 0);
    assert!(m.brake().is_idle());
}

#[test]
fn reverse_directions_flip_polarity() {
    let mut m = module();
    m.set_brake_reverse_directions(true);
    m.brake_actuate(BrakeProfile::parse("2 3000 10 -1000 10").unwrap(), console_handler)
        .unwrap();
    m.run_for(100);
    assert_eq!(m.board().coil_history(), &[-3000, 1000]);
}

#[test]
fn busy_driver_within_watchdog_still_succeeds() {
    let mut m = module();
    m.board_mut().set_coil_busy(20);
    m.brake_actuate_simple(2000, 10, console_handler).unwrap();
    m.run_for(200);
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeSuccess]);
}

#[test]
fn busy_driver_past_watchdog_times_out() {
    let mut m = module();
    m.board_mut().set_coil_busy(1000);
    m.brake_actuate_simple(2000, 10, console_handler).unwrap();
    m.run_for(200);
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeTimeout]);
    assert_eq!(m.board().coil_current_ma(), 0);
}

#[test]
fn coil_fault_reports_failure() {
    let mut m = module();
    m.board_mut().set_coil_fault(true);
    m.brake_actuate_simple(2000, 10, console_handler).unwrap();
    m.run_for(50);
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeFailure]);
    assert!(m.brake().is_idle());
}

#[test]
fn braking_discards_running_motor_completion() {
    let mut m = module();
    m.set_speed(3000, false, 0, console_handler).unwrap();
    m.run_for(20);
    m.brake_actuate_simple(3000, 40, console_handler).unwrap();
    assert_eq!(m.motor().mode(), MotorMode::Coasting);

    m.run_for(2000);
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeSuccess]);
}
