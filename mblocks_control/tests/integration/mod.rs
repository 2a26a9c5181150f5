//! Integration test modules and shared helpers.

mod brake;
mod charge;
mod inertial;
mod plane_change;
mod sleep;
mod sma;
mod supersession;

use mblocks_common::actuator::event::{CompletionEvent, MotionEvent, MotionPrimitive};
use mblocks_common::config::ModuleConfig;
use mblocks_control::module::Module;
use mblocks_control::sim::SimBoard;

/// Module on a fresh simulated board with the default configuration.
pub fn module() -> Module<SimBoard> {
    Module::new(SimBoard::new(), &ModuleConfig::default()).unwrap()
}

/// Module built from a TOML configuration string.
pub fn module_from_toml(toml: &str) -> Module<SimBoard> {
    let config = ModuleConfig::from_toml(toml).unwrap();
    Module::new(SimBoard::new(), &config).unwrap()
}

pub fn primitives(m: &Module<SimBoard>) -> Vec<MotionPrimitive> {
    m.console().filter_map(CompletionEvent::as_primitive).collect()
}

pub fn motions(m: &Module<SimBoard>) -> Vec<MotionEvent> {
    m.console().filter_map(CompletionEvent::as_motion).collect()
}
