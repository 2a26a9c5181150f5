//! Battery power management.

pub mod charge;
