//! Hardware abstraction layer traits and types.
//!
//! The controllers never touch peripherals directly. They consume the
//! narrow driver traits defined in [`driver`], which a board support crate
//! or the software simulation implements.

pub mod driver;
pub mod types;

pub use driver::{AuxPower, BldcBridge, Board, Charger, CoilDriver, HalError, PwmDriver, Tachometer};
pub use types::{BridgeDrive, ChargerMode, PwmChannel};
