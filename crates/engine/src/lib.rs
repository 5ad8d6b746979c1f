//! Event machines driving a level: tick-scheduled controllers built on
//! top of `blockfall-core`.
//!
//! - [`falling`]: places one block instance and lets it fall, freezing it
//!   when a board change pushes it into occupied territory.
//! - [`positioner`]: keeps the level's viewport near the controlled
//!   instances, with smooth transitions.
//!
//! Machines hold instance ids, never instance references; all geometry
//! goes through [`Level`](blockfall_core::Level). A game loop advances the
//! level tick, drains [`Level::events_due`](blockfall_core::Level::events_due)
//! and triggers the matching machines.

pub mod falling;
pub mod positioner;

pub use falling::{FallingBlockEvent, FallingSignal, FALLING_BLOCK_Z};
pub use positioner::{PositionerConfig, PositionerEvent, PositionerMsg};
