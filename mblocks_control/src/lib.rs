//! # MBlocks Control Library
//!
//! Actuator control and completion-event orchestration for an MBlocks
//! module: a BLDC flywheel drive, an SMA latch, an electromagnetic brake and
//! battery charge management.
//!
//! ## Structure
//!
//! 1. **Controllers** (`actuator`, `power`): one state machine per physical
//!    actuator. Start operations arm hardware and return immediately.
//! 2. **Event bus** (`event`): fixed-capacity FIFO of completion events and
//!    the generation-tagged handler registry.
//! 3. **Orchestrator** (`orchestrator`): composite maneuvers chained from
//!    primitive completions.
//! 4. **Module context** (`module`): owns everything above plus the board,
//!    and runs the detection/dispatch main-loop pass.
//!
//! ## No Allocation After Construction
//!
//! Event ring, handler table, brake steps and stage log are `heapless`
//! containers sized at compile time. Handlers are plain function pointers.

pub mod actuator;
pub mod config;
pub mod control;
pub mod event;
pub mod module;
pub mod orchestrator;
pub mod power;
pub mod sim;
