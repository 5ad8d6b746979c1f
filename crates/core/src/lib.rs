//! Core geometry for falling-block games: block shape catalogs, their
//! positioned instances, and the level tying instances to a tile board.
//!
//! Everything here is pure and deterministic; no I/O, no timers. The crate
//! splits into three layers:
//!
//! - [`block`]: the [`Block`] shape catalog. Bricks carry tiles, shapes
//!   place bricks on a grid, with cached bounds and contact maps.
//! - [`level_block`]: a [`Block`] instance with a position, depth and
//!   ownership metadata.
//! - [`level`]: the board, the instances over it, the cell ownership
//!   protocol, a tick scheduler and the camera viewport.
//!
//! # Ownership protocol
//!
//! Owner-managed instances mark the board cells under their visible
//! bricks. Every geometry mutation of an added instance goes through
//! [`Level`] methods which clear the marks, apply the change and re-mark,
//! so no two instances ever claim the same cell.
//!
//! # Example
//!
//! ```
//! use blockfall_core::{Block, Level, LevelBlock, Mgmt};
//! use blockfall_core::types::{Point, Tile};
//!
//! let block = Block::with_rotations(
//!     &[Tile::new('#'); 4],
//!     &[(true, 0, 0), (true, 0, 1), (true, 1, 1), (true, 2, 1)],
//!     3,
//! );
//! let mut level = Level::new(10, 20);
//! let piece = LevelBlock::new(block, None, Point::new(4, 0), 0, true, None, false);
//! let id = level.block_add(piece, Mgmt::AutoStrictOwner).ok().unwrap();
//! level.block_move(id, 0, 1);
//! assert_eq!(level.block(id).unwrap().pos(), Point::new(4, 1));
//! ```

pub mod block;
pub mod level;
pub mod level_block;

pub use blockfall_types as types;

// Re-export commonly used types for convenience
pub use block::{Block, BlockFusion, BrickChange, BrickDef, BrickId, Contact, ShapeId};
pub use level::{EventId, Level, Show};
pub use level_block::{
    AniBinding, AttackOutcome, BlockChanges, LevelBlock, LevelBlockId, Mgmt,
};
