//! Integration test: supersession and stale-event filtering.
//!
//! A new command on a source replaces the registration of the previous one;
//! completions of the replaced command are never delivered.

use mblocks_common::actuator::event::{MotionEvent, MotionPrimitive, Source};
use mblocks_common::actuator::state::StageId;
use mblocks_control::module::console_handler;
use mblocks_control::orchestrator::maneuver::{InertialActuation, PlaneChange, StageEntry};
use proptest::prelude::*;

use super::{module, motions, primitives};

fn inertial() -> InertialActuation {
    InertialActuation {
        speed_rpm: 3000,
        reverse: false,
        brake_current_ma: 3000,
        brake_time_ms: 50,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn second_speed_command_owns_the_completion(
        first_rpm in 0u32..=6000,
        first_reverse in any::<bool>(),
        second_rpm in 1000u32..=6000,
        second_reverse in any::<bool>(),
    ) {
        let mut m = module();
        let first = m.set_speed(first_rpm, first_reverse, 0, console_handler).unwrap();
        let second = m.set_speed(second_rpm, second_reverse, 0, console_handler).unwrap();
        prop_assert_ne!(first, second);

        prop_assert!(m.run_until(3000, |m| m.console().count() > 0));
        m.run_for(200);

        let events: Vec<_> = m.console().copied().collect();
        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(events[0].source, Source::Motor);
        prop_assert_eq!(events[0].token, second);
        prop_assert_eq!(events[0].as_primitive(), Some(MotionPrimitive::MotorStabilized));
        prop_assert_eq!(m.motor().target_rpm(), second_rpm);
    }
}

#[test]
fn new_maneuver_invalidates_the_prior_one() {
    let mut m = module();
    let first = m.inertial_actuation(inertial(), console_handler).unwrap();
    m.run_for(30);
    let second = m.inertial_actuation(inertial(), console_handler).unwrap();

    assert!(m.run_until(3000, |m| m.console().count() > 0));
    m.run_for(500);

    let events: Vec<_> = m.console().copied().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].token, second);
    assert_eq!(motions(&m), vec![MotionEvent::InertialActuationComplete]);
    assert_eq!(
        m.stage_log().entries(first).collect::<Vec<_>>(),
        vec![StageEntry::Entered(StageId::Spin), StageEntry::Superseded]
    );
}

#[test]
fn direct_brake_command_drops_maneuver() {
    let mut m = module();
    let token = m.inertial_actuation(inertial(), console_handler).unwrap();
    m.run_for(50);
    m.brake_actuate_simple(2000, 30, console_handler).unwrap();
    assert!(m.maneuver().is_none());

    m.run_for(2000);
    assert_eq!(primitives(&m), vec![MotionPrimitive::BrakeSuccess]);
    assert!(motions(&m).is_empty());
    assert_eq!(m.stage_log().entries(token).last(), Some(StageEntry::Superseded));
}

#[test]
fn stop_motor_cancels_maneuver_silently() {
    let mut m = module();
    m.plane_change(
        PlaneChange::Accelerate {
            current_ma: 2000,
            duration_ms: 200,
            reverse: false,
        },
        console_handler,
    )
    .unwrap();
    m.run_for(20);
    m.stop_motor(false);
    assert!(m.maneuver().is_none());

    m.run_for(1000);
    assert_eq!(m.console().count(), 0);
}

#[test]
fn sma_retract_supersedes_pending_extend() {
    let mut m = module();
    m.sma_retract(30, console_handler).unwrap();
    m.run_for(40);
    m.sma_extend(console_handler).unwrap();
    m.run_for(10);
    m.sma_retract(30, console_handler).unwrap();

    m.run_for(1000);
    assert_eq!(
        primitives(&m),
        vec![MotionPrimitive::SmaRetracted, MotionPrimitive::SmaRetracted]
    );
}
