//! A block instance living on a level: a [`Block`] plus its current shape,
//! position, depth and ownership metadata.
//!
//! Geometry mutations on an added instance must go through the level so
//! board ownership marks stay in sync; the methods here either are pure
//! queries or are meant for instances not (yet) on a level.

use rustc_hash::FxHashMap;

use blockfall_types::{Direction, Point, Rect, Size, Tile};

use crate::block::{Block, BrickChange, BrickId, Contact, ShapeId};

/// Identifies a block instance within one level. Assigned when the
/// instance is added; never reused within that level.
pub type LevelBlockId = u32;

/// How the level manages an added instance.
///
/// Each variant implies the ones before it: an owner-managed block also
/// follows board scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mgmt {
    /// On the level but ignored by board bookkeeping.
    Normal,
    /// Position follows board scrolls.
    AutoScroll,
    /// Board cells under visible bricks are marked as owned.
    AutoOwner,
    /// Like `AutoOwner`, and owned cells must hold empty board tiles.
    AutoStrictOwner,
}

impl Mgmt {
    pub fn auto_scrolled(self) -> bool {
        !matches!(self, Mgmt::Normal)
    }

    pub fn auto_owner(self) -> bool {
        matches!(self, Mgmt::AutoOwner | Mgmt::AutoStrictOwner)
    }

    pub fn strict_owner(self) -> bool {
        matches!(self, Mgmt::AutoStrictOwner)
    }
}

/// What happens when one block attacks another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Nothing,
    /// The attacked block wants to be fused into the attacker.
    FuseToAttacker,
    /// The attacked block freezes itself onto the board.
    FreezeAttacked,
    /// The attacked block vacates the contested cells.
    FreesPosition,
    Other,
}

/// Reference to a tile animation running on one brick: which animator and
/// an opaque per-animation hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AniBinding {
    pub animator: u32,
    pub hash: i32,
}

/// A batch of geometry changes applied atomically to an instance.
#[derive(Debug, Clone, Default)]
pub struct BlockChanges {
    /// Applied to the instance position after removals.
    pub delta: Point,
    /// Bricks taken off the block (e.g. handed to the board or fused away).
    pub remove: Vec<BrickId>,
    /// Bricks destroyed outright. Same geometric effect as `remove`,
    /// listeners are told apart.
    pub destroy: Vec<BrickId>,
    /// Per-brick moves within the current shape.
    pub reposition: Vec<BrickChange>,
    /// Tile payload replacements.
    pub retile: Vec<(BrickId, Tile)>,
    /// New bricks: tile, position in the current shape, visibility.
    pub add: Vec<(Tile, Point, bool)>,
}

/// A positioned block instance.
#[derive(Debug, Clone)]
pub struct LevelBlock {
    id: LevelBlockId,
    block: Block,
    shape: ShapeId,
    pos: Point,
    pos_z: i32,
    mgmt: Option<Mgmt>,
    controllable: bool,
    controller_team: Option<u32>,
    team: Option<u32>,
    teammate: Option<u32>,
    player: Option<u32>,
    remove_empty_shapes: bool,
    /// Lazy per (direction, shape) contact lists.
    contact_cache: FxHashMap<(u8, ShapeId), Vec<Contact>>,
    /// Per-brick animation channel slots.
    ani: FxHashMap<BrickId, Vec<Option<AniBinding>>>,
    ani_channels: usize,
}

impl LevelBlock {
    /// Creates a detached instance.
    ///
    /// A block without shapes gets one inserted so the instance always has
    /// a current shape; `shape` picks the starting shape, defaulting to
    /// the first one. With `remove_empty_shapes` every mutation drops
    /// shapes left without visible bricks.
    pub fn new(
        mut block: Block,
        shape: Option<ShapeId>,
        pos: Point,
        pos_z: i32,
        controllable: bool,
        controller_team: Option<u32>,
        remove_empty_shapes: bool,
    ) -> LevelBlock {
        if block.tot_shapes() == 0 {
            block.shape_insert(None);
        }
        let first = block.shape_first();
        let shape = match shape {
            Some(s) if block.is_shape(s) => s,
            _ => match first {
                // tot_shapes() > 0 is guaranteed above
                Some(s) => s,
                None => 0,
            },
        };
        LevelBlock {
            id: 0,
            block,
            shape,
            pos,
            pos_z,
            mgmt: None,
            controllable,
            controller_team,
            team: None,
            teammate: None,
            player: None,
            remove_empty_shapes,
            contact_cache: FxHashMap::default(),
            ani: FxHashMap::default(),
            ani_channels: 0,
        }
    }

    /// Id within the level; 0 until the instance is added.
    pub fn id(&self) -> LevelBlockId {
        self.id
    }

    pub fn is_added(&self) -> bool {
        self.mgmt.is_some()
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Drawing depth; higher is in front.
    pub fn pos_z(&self) -> i32 {
        self.pos_z
    }

    pub fn set_pos_z(&mut self, z: i32) {
        self.pos_z = z;
    }

    pub fn mgmt(&self) -> Option<Mgmt> {
        self.mgmt
    }

    pub fn is_controllable(&self) -> bool {
        self.controllable
    }

    pub fn controller_team(&self) -> Option<u32> {
        self.controller_team
    }

    pub fn team(&self) -> Option<u32> {
        self.team
    }

    pub fn teammate(&self) -> Option<u32> {
        self.teammate
    }

    /// Level-wide player number of the controlling player, if any.
    pub fn player(&self) -> Option<u32> {
        self.player
    }

    pub fn set_controller(&mut self, team: Option<u32>, teammate: Option<u32>, player: Option<u32>) {
        self.team = team;
        self.teammate = teammate;
        self.player = player;
    }

    // ---- current-shape queries ----

    pub fn tot_bricks(&self) -> usize {
        self.block.tot_bricks()
    }

    pub fn brick_ids(&self) -> &[BrickId] {
        self.block.brick_ids()
    }

    pub fn brick_tile(&self, brick: BrickId) -> Tile {
        self.block.brick_tile(brick)
    }

    /// Brick position relative to the instance position.
    pub fn brick_pos(&self, brick: BrickId) -> Point {
        self.block.shape_brick_pos(self.shape, brick)
    }

    pub fn brick_visible(&self, brick: BrickId) -> bool {
        self.block.shape_brick_visible(self.shape, brick)
    }

    pub fn tot_visible(&self) -> usize {
        self.block.shape_tot_visible(self.shape)
    }

    pub fn size(&self) -> Size {
        self.block.shape_size(self.shape)
    }

    pub fn min_pos(&self) -> Point {
        self.block.shape_min_pos(self.shape)
    }

    pub fn max_pos(&self) -> Point {
        self.block.shape_max_pos(self.shape)
    }

    /// Absolute cells covered by the visible bricks of the current shape.
    pub fn coords(&self) -> Vec<Point> {
        self.block
            .brick_ids()
            .iter()
            .filter(|&&b| self.block.shape_brick_visible(self.shape, b))
            .map(|&b| self.pos + self.block.shape_brick_pos(self.shape, b))
            .collect()
    }

    /// Absolute bounding rectangle of the current shape; empty when no
    /// brick is visible.
    pub fn rect(&self) -> Rect {
        if self.block.shape_tot_visible(self.shape) == 0 {
            return Rect::default();
        }
        let min = self.pos + self.block.shape_min_pos(self.shape);
        let sz = self.block.shape_size(self.shape);
        Rect::new(min.x, min.y, sz.w, sz.h)
    }

    /// Contacts of the current shape in the given direction, relative to
    /// the shape. Cached until the next mutation.
    pub fn contacts(&mut self, dir: Direction) -> &[Contact] {
        let key = (dir.index() as u8, self.shape);
        let block = &self.block;
        let shape = self.shape;
        self.contact_cache
            .entry(key)
            .or_insert_with(|| block.shape_contacts(shape, dir))
    }

    // ---- tile animation bindings ----

    /// Drops all bindings and sets the number of channels per brick.
    pub fn ani_reset(&mut self, channels: usize) {
        self.ani.clear();
        self.ani_channels = channels;
    }

    pub fn ani_channels(&self) -> usize {
        self.ani_channels
    }

    pub fn ani_set(&mut self, brick: BrickId, channel: usize, binding: Option<AniBinding>) {
        debug_assert!(channel < self.ani_channels);
        let slots = self
            .ani
            .entry(brick)
            .or_insert_with(|| vec![None; self.ani_channels]);
        slots[channel] = binding;
    }

    pub fn ani_get(&self, brick: BrickId, channel: usize) -> Option<AniBinding> {
        debug_assert!(channel < self.ani_channels);
        self.ani.get(&brick).and_then(|s| s[channel])
    }

    // ---- mutations for detached instances ----

    /// Moves a detached instance. Added instances move through the level.
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        debug_assert!(!self.is_added());
        self.pos += Point::new(dx, dy);
    }

    /// Moves and reshapes a detached instance.
    pub fn move_rotate(&mut self, shape: ShapeId, dx: i32, dy: i32) {
        debug_assert!(!self.is_added());
        debug_assert!(self.block.is_shape(shape));
        self.shape = shape;
        self.pos += Point::new(dx, dy);
        self.reset_caches();
    }

    /// Applies a change batch to a detached instance. Returns the brick
    /// ids created for `changes.add`, in order.
    pub fn modify(&mut self, changes: &BlockChanges) -> Vec<BrickId> {
        debug_assert!(!self.is_added());
        self.apply_changes(changes)
    }

    // ---- level internals ----

    pub(crate) fn set_added(&mut self, id: LevelBlockId, mgmt: Mgmt) {
        self.id = id;
        self.mgmt = Some(mgmt);
    }

    pub(crate) fn set_detached(&mut self) {
        self.mgmt = None;
    }

    pub(crate) fn raw_move(&mut self, shape: Option<ShapeId>, dx: i32, dy: i32) {
        if let Some(s) = shape {
            debug_assert!(self.block.is_shape(s));
            self.shape = s;
        }
        self.pos += Point::new(dx, dy);
        self.reset_caches();
    }

    /// Replaces the geometry wholesale after a fusion.
    pub(crate) fn replace_block(&mut self, block: Block, shape: ShapeId, pos: Point) {
        self.block = block;
        self.shape = shape;
        self.pos = pos;
        self.reset_caches();
    }

    pub(crate) fn take_ani(&mut self) -> FxHashMap<BrickId, Vec<Option<AniBinding>>> {
        std::mem::take(&mut self.ani)
    }

    pub(crate) fn put_ani(&mut self, ani: FxHashMap<BrickId, Vec<Option<AniBinding>>>) {
        self.ani = ani;
    }

    /// Applies a batch of geometry changes. Returns the brick ids created
    /// for `changes.add`, in order.
    ///
    /// Order: removals and destructions first, then tile payloads, then
    /// the position delta, then per-brick repositions, then additions.
    /// Bindings of removed bricks are dropped.
    pub(crate) fn apply_changes(&mut self, changes: &BlockChanges) -> Vec<BrickId> {
        for &b in changes.remove.iter().chain(changes.destroy.iter()) {
            let ok = self.block.brick_remove(b);
            debug_assert!(ok);
            self.ani.remove(&b);
        }
        for &(b, tile) in &changes.retile {
            self.block.brick_modify(b, tile);
        }
        self.pos += changes.delta;
        if !changes.reposition.is_empty() {
            self.block.shape_modify_bricks(self.shape, &changes.reposition);
        }
        let mut added = Vec::with_capacity(changes.add.len());
        for &(tile, pos, visible) in &changes.add {
            added.push(self.block.brick_add(tile, pos, visible));
        }
        if self.remove_empty_shapes {
            self.block.shape_remove_all_invisible();
            if !self.block.is_shape(self.shape) {
                self.shape = self.block.shape_first().unwrap_or(0);
            }
        }
        self.reset_caches();
        added
    }

    pub(crate) fn reset_caches(&mut self) {
        self.contact_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domino() -> Block {
        Block::from_shapes(
            &[Tile::new('a'), Tile::new('b')],
            &[vec![(true, 0, 0), (true, 0, 1)]],
        )
    }

    #[test]
    fn test_rect_and_coords() {
        let lb = LevelBlock::new(domino(), None, Point::new(4, 7), 0, false, None, false);
        assert_eq!(lb.rect(), Rect::new(4, 7, 1, 2));
        let mut c = lb.coords();
        c.sort_unstable();
        assert_eq!(c, vec![Point::new(4, 7), Point::new(4, 8)]);
    }

    #[test]
    fn test_contact_cache_invalidated_on_move() {
        let mut lb = LevelBlock::new(domino(), None, Point::new(0, 0), 0, false, None, false);
        let down = lb.contacts(Direction::Down).to_vec();
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].pos, Point::new(0, 2));
        lb.raw_move(None, 3, 0);
        // contacts are shape-relative, the move alone must not change them
        assert_eq!(lb.contacts(Direction::Down), &down[..]);
    }

    #[test]
    fn test_apply_changes_drops_empty_shapes() {
        // brick 0 is only visible in the first shape, brick 1 only in the
        // second; removing brick 0 empties the first shape
        let b = Block::from_shapes(
            &[Tile::new('a'), Tile::new('b')],
            &[
                vec![(true, 0, 0), (false, 1, 0)],
                vec![(false, 0, 0), (true, 1, 0)],
            ],
        );
        let shapes = b.shape_ids().to_vec();
        let mut lb = LevelBlock::new(b, Some(shapes[0]), Point::new(0, 0), 0, false, None, true);
        let changes = BlockChanges {
            remove: vec![0],
            ..Default::default()
        };
        lb.apply_changes(&changes);
        assert_eq!(lb.block().tot_shapes(), 1);
        assert!(!lb.block().is_shape(shapes[0]));
        // the current shape moved to the surviving one
        assert_eq!(lb.shape(), shapes[1]);
        assert_eq!(lb.tot_visible(), 1);
    }

    #[test]
    fn test_apply_changes_add_and_remove() {
        let mut lb = LevelBlock::new(domino(), None, Point::new(0, 0), 0, false, None, false);
        let changes = BlockChanges {
            delta: Point::new(1, 0),
            remove: vec![0],
            add: vec![(Tile::new('c'), Point::new(1, 1), true)],
            ..Default::default()
        };
        let added = lb.apply_changes(&changes);
        assert_eq!(added.len(), 1);
        assert_eq!(lb.pos(), Point::new(1, 0));
        assert_eq!(lb.block().tot_bricks(), 2);
        // bricks left at (0, 1) and (1, 1)
        assert_eq!(lb.block().shape_size(lb.shape()), Size::new(2, 1));
    }
}
