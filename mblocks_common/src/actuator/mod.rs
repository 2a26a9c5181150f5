//! Actuator shared types.
//!
//! All types shared between the controllers, the orchestrator and callers
//! live here. Organized by domain: state enums, rejection errors, completion
//! event payloads, rational gains, brake profiles and configuration.

pub mod brake;
pub mod config;
pub mod error;
pub mod event;
pub mod gain;
pub mod state;
