//! Integration test: inertial actuation.
//!
//! Spin → Hold → Brake on the simulated flywheel, exactly one terminal
//! event per accepted maneuver, and the failure paths of every stage.

use mblocks_common::actuator::event::{MotionEvent, Source};
use mblocks_common::actuator::state::{MotorMode, StageId};
use mblocks_control::module::console_handler;
use mblocks_control::orchestrator::maneuver::{InertialActuation, StageEntry};

use super::{module, module_from_toml, motions};

fn params(speed_rpm: u32) -> InertialActuation {
    InertialActuation {
        speed_rpm,
        reverse: false,
        brake_current_ma: 3000,
        brake_time_ms: 100,
    }
}

#[test]
fn completes_with_single_terminal_event() {
    let mut m = module();
    let token = m.inertial_actuation(params(3000), console_handler).unwrap();
    assert_eq!(m.maneuver().map(|x| x.stage()), Some(StageId::Spin));

    assert!(m.run_until(3000, |m| m.console().count() > 0));
    m.run_for(500);

    let events: Vec<_> = m.console().copied().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, Source::Maneuver);
    assert_eq!(events[0].token, token);
    assert_eq!(motions(&m), vec![MotionEvent::InertialActuationComplete]);
    assert_eq!(
        m.stage_log().entries(token).collect::<Vec<_>>(),
        vec![
            StageEntry::Entered(StageId::Spin),
            StageEntry::Entered(StageId::Hold),
            StageEntry::Entered(StageId::Brake),
            StageEntry::Finished(MotionEvent::InertialActuationComplete),
        ]
    );
    assert_eq!(m.board().coil_history(), &[3000]);
    assert_eq!(m.board().coil_current_ma(), 0);
    assert!(!m.motor().mode().is_driven());
}

#[test]
fn hold_stage_lasts_configured_time() {
    let mut m = module_from_toml("[maneuver]\nhold_ms = 300\n");
    let token = m.inertial_actuation(params(3000), console_handler).unwrap();
    assert!(m.run_until(3000, |m| m.console().count() > 0));

    let at = |stage| {
        m.stage_log()
            .iter()
            .find(|r| r.maneuver == token && r.entry == StageEntry::Entered(stage))
            .map(|r| r.at_ms)
            .unwrap()
    };
    let held = at(StageId::Brake) - at(StageId::Hold);
    assert!((300..=310).contains(&held), "held {held} ms");
}

#[test]
fn brake_fault_fails_and_leaves_motor_coasting() {
    let mut m = module();
    m.board_mut().set_coil_fault(true);
    let token = m.inertial_actuation(params(3000), console_handler).unwrap();

    assert!(m.run_until(3000, |m| m.console().count() > 0));
    assert_eq!(motions(&m), vec![MotionEvent::InertialActuationFailure]);
    assert_eq!(
        m.stage_log().entries(token).last(),
        Some(StageEntry::Finished(MotionEvent::InertialActuationFailure))
    );
    assert!(matches!(m.motor().mode(), MotorMode::Coasting | MotorMode::Off));
    assert_eq!(m.board().coil_current_ma(), 0);
    assert!(m.maneuver().is_none());
}

#[test]
fn brake_watchdog_fails_maneuver() {
    let mut m = module();
    m.board_mut().set_coil_busy(10_000);
    m.inertial_actuation(params(3000), console_handler).unwrap();

    assert!(m.run_until(3000, |m| m.console().count() > 0));
    assert_eq!(motions(&m), vec![MotionEvent::InertialActuationFailure]);
    assert!(m.board().coil_history().is_empty());
}

#[test]
fn unreachable_speed_times_out_in_spin() {
    let mut m = module();
    // Plant tops out near 8000 rpm at the default 4000 mA ceiling.
    let token = m.inertial_actuation(params(12_000), console_handler).unwrap();

    assert!(m.run_until(5000, |m| m.console().count() > 0));
    assert_eq!(motions(&m), vec![MotionEvent::InertialActuationFailure]);
    assert_eq!(
        m.stage_log().entries(token).collect::<Vec<_>>(),
        vec![
            StageEntry::Entered(StageId::Spin),
            StageEntry::Finished(MotionEvent::InertialActuationFailure),
        ]
    );
    assert!(!m.motor().mode().is_driven());
    assert!(m.board().coil_history().is_empty());
}

#[test]
fn reverse_spin_sets_bridge_direction() {
    let mut m = module();
    m.inertial_actuation(
        InertialActuation {
            reverse: true,
            ..params(3000)
        },
        console_handler,
    )
    .unwrap();
    m.run_for(10);
    assert!(m.board().bridge_reverse());

    m.set_motor_reverse_directions(true);
    m.inertial_actuation(
        InertialActuation {
            reverse: true,
            ..params(3000)
        },
        console_handler,
    )
    .unwrap();
    assert!(!m.board().bridge_reverse());
}

#[test]
fn rejected_parameters_leave_no_trace() {
    let mut m = module();
    assert!(m.inertial_actuation(params(0), console_handler).is_err());
    assert!(
        m.inertial_actuation(
            InertialActuation {
                brake_current_ma: 100_000,
                ..params(3000)
            },
            console_handler
        )
        .is_err()
    );
    m.run_for(100);
    assert_eq!(m.console().count(), 0);
    assert!(m.stage_log().is_empty());
    assert_eq!(m.motor().mode(), MotorMode::Off);
}
