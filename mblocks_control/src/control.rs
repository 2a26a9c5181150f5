//! Speed control law and tachometer conversion.
//!
//! Integer arithmetic only: gains are exact rationals, speeds are whole rpm,
//! currents whole mA.

pub mod pid;
pub mod tacho;
