//! Integration test: charge management.

use mblocks_common::actuator::error::CommandError;
use mblocks_common::actuator::state::ChargeState;
use mblocks_common::hal::{ChargerMode, HalError};
use mblocks_control::power::charge::ChargeTransition;

use super::module;

#[test]
fn manual_only_mutations() {
    let mut m = module();
    assert!(matches!(
        m.set_charger_current_limit(800),
        Err(CommandError::IllegalChargeState {
            state: ChargeState::Off,
            ..
        })
    ));
    assert!(matches!(
        m.set_discharge_switches(&[1, 0, 0, 0]),
        Err(CommandError::IllegalChargeState { .. })
    ));
    assert_eq!(m.board().discharge_bits(), 0);

    m.set_charge_state(ChargeState::Standby).unwrap();
    assert!(m.set_charger_current_limit(800).is_err());
}

#[test]
fn manual_session() {
    let mut m = module();
    assert_eq!(
        m.set_charge_state(ChargeState::Manual),
        Ok(ChargeTransition::Ok(ChargeState::Manual))
    );
    assert_eq!(m.board().charger_mode(), ChargerMode::Enabled);

    m.set_charger_current_limit(800).unwrap();
    m.set_discharge_switches(&[1, 0, 1, 0]).unwrap();
    assert_eq!(m.board().charger_limit_ma(), 800);
    assert_eq!(m.board().discharge_bits(), 0b0101);
    assert_eq!(m.charge().discharge_switches(), [1, 0, 1, 0]);

    assert!(matches!(
        m.set_discharge_switches(&[1, 3, 0, 0]),
        Err(CommandError::InvalidSwitchValue { cell: 1, value: 3 })
    ));
    assert_eq!(m.board().discharge_bits(), 0b0101);

    assert_eq!(
        m.set_charge_state(ChargeState::Manual),
        Ok(ChargeTransition::Unchanged(ChargeState::Manual))
    );
}

#[test]
fn transitions_pass_through_off() {
    let mut m = module();
    m.set_charge_state(ChargeState::Precharge).unwrap();
    assert_eq!(
        m.set_charge_state(ChargeState::Discharge),
        Err(CommandError::InvalidChargeTransition {
            from: ChargeState::Precharge,
            to: ChargeState::Discharge
        })
    );
    assert_eq!(m.charge().state(), ChargeState::Precharge);

    m.set_charge_state(ChargeState::Off).unwrap();
    m.set_charge_state(ChargeState::Discharge).unwrap();
    assert_eq!(m.board().discharge_bits(), 0b1111);
    assert_eq!(m.board().charger_mode(), ChargerMode::Disabled);
}

#[test]
fn charger_failure_falls_back_to_off() {
    let mut m = module();
    m.board_mut().set_charger_failure(true);
    assert_eq!(
        m.set_charge_state(ChargeState::Standby),
        Err(CommandError::Hardware(HalError::BusTimeout))
    );
    assert_eq!(m.charge().state(), ChargeState::Off);
    assert!(m.battery_voltages_mv().is_err());
}

#[test]
fn read_outs_and_debug_flag() {
    let mut m = module();
    m.board_mut().set_cell_voltages_mv([3600, 3650, 3700, 3750]);
    m.board_mut().set_input_voltage_mv(5100);
    m.board_mut().set_charge_current_ma(420);

    assert_eq!(m.battery_voltages_mv(), Ok([3600, 3650, 3700, 3750]));
    assert_eq!(m.input_voltage_mv(), Ok(5100));
    assert_eq!(m.charge_current_ma(), Ok(420));

    m.set_debug_output(true);
    assert!(m.charge().debug_output());
}
