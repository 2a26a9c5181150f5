//! Completion event delivery.
//!
//! - [`bus`]: fixed-capacity FIFO ring that detection posts into
//! - [`registry`]: one generation-tagged handler slot per event source

pub mod bus;
pub mod registry;
