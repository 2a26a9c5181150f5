//! MBlocks Common Library
//!
//! Shared constants, actuator state types, completion event payloads,
//! configuration loading and hardware traits for the MBlocks module firmware.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits
//! - [`actuator`] - State enums, errors, events, gains and brake profiles
//! - [`hal`] - Traits for the peripheral drivers the core consumes
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use mblocks_common::prelude::*;
//!
//! let kp = Rational::new(3, 7).unwrap();
//! assert_eq!(kp.parts(), (3, 7));
//! ```

pub mod actuator;
pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
