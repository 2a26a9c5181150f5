//! Per-actuator controllers.
//!
//! Each controller owns its state machine and timers but no hardware: the
//! peripherals are passed into every call. Start operations either reject
//! synchronously with a `CommandError` (nothing changed) or arm hardware and
//! return, optionally with an outcome that is already final. `poll` runs the
//! detection step of the main loop and yields at most one terminal outcome.

pub mod brake;
pub mod motor;
pub mod sma;
